//! Command-line construction for the training script.

use std::path::Path;

use crate::job::TrainLoraRequest;

/// Resolved inputs that end up on the command line.
#[derive(Debug)]
pub struct CommandInputs<'a> {
    pub python: &'a str,
    pub script: &'a str,
    pub base_model: &'a Path,
    pub dataset_dir: &'a Path,
    pub output_dir: &'a Path,
    pub output_name: &'a str,
}

/// Build the ordered argv: interpreter, script, one flag per parameter,
/// the fixed optimizer/bucketing/format flags, then the caller's extra
/// arguments unchanged.
pub fn build_command(inputs: &CommandInputs<'_>, request: &TrainLoraRequest) -> Vec<String> {
    let mut command = vec![
        inputs.python.to_string(),
        inputs.script.to_string(),
        format!(
            "--pretrained_model_name_or_path={}",
            inputs.base_model.display()
        ),
        format!("--train_data_dir={}", inputs.dataset_dir.display()),
        format!("--output_dir={}", inputs.output_dir.display()),
        format!("--output_name={}", inputs.output_name),
        format!("--max_train_steps={}", request.effective_max_train_steps()),
        format!("--network_dim={}", request.effective_network_dim()),
        format!("--learning_rate={}", request.effective_learning_rate()),
        "--optimizer_type=adamw8bit".to_string(),
        "--enable_bucket".to_string(),
        "--save_model_as=safetensors".to_string(),
    ];
    command.extend(request.extra_args().iter().cloned());
    command
}
