pub mod runner;

pub use runner::{
    instance_stage, machine_stage, task_stage, InstanceStage, MachineStage, Pipeline,
    PipelineError, TaskStage,
};
