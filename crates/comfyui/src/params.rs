//! Request parameters for the generation and upscale workflows and their
//! mapping onto template placeholder names.

use nova_core::types::Params;
use serde::Deserialize;
use serde_json::json;

/// Default classifier-free guidance scale.
pub const DEFAULT_CFG_SCALE: f64 = 7.0;
/// Default sampling steps.
pub const DEFAULT_STEPS: u32 = 30;
/// Default sampler name.
pub const DEFAULT_SAMPLER: &str = "euler";
/// Default scheduler name.
pub const DEFAULT_SCHEDULER: &str = "normal";
/// Default output edge length in pixels.
pub const DEFAULT_DIMENSION: u32 = 1024;
/// Default upscale model.
pub const DEFAULT_UPSCALE_MODEL: &str = "4x-UltraSharp.pth";
/// Default upscale factor.
pub const DEFAULT_UPSCALE_FACTOR: f64 = 2.0;

/// Inputs for a text-to-image generation.
#[derive(Debug, Clone, Deserialize)]
pub struct GenerationParams {
    pub prompt: String,
    #[serde(default)]
    pub negative_prompt: Option<String>,
    #[serde(default)]
    pub lora_path: Option<String>,
    #[serde(default = "default_cfg_scale")]
    pub cfg_scale: f64,
    #[serde(default = "default_steps")]
    pub steps: u32,
    /// Derived from the current time when absent.
    #[serde(default)]
    pub seed: Option<i64>,
    #[serde(default = "default_sampler")]
    pub sampler: String,
    #[serde(default = "default_scheduler")]
    pub scheduler: String,
    #[serde(default = "default_dimension")]
    pub width: u32,
    #[serde(default = "default_dimension")]
    pub height: u32,
    /// Falls back to the configured default checkpoint.
    #[serde(default)]
    pub base_model: Option<String>,
}

impl GenerationParams {
    /// A request with only a prompt set and every other field defaulted.
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            negative_prompt: None,
            lora_path: None,
            cfg_scale: DEFAULT_CFG_SCALE,
            steps: DEFAULT_STEPS,
            seed: None,
            sampler: DEFAULT_SAMPLER.to_string(),
            scheduler: DEFAULT_SCHEDULER.to_string(),
            width: DEFAULT_DIMENSION,
            height: DEFAULT_DIMENSION,
            base_model: None,
        }
    }

    /// Placeholder values for the generation template.
    pub fn to_params(&self, base_model: &str, seed: i64) -> Params {
        Params::from([
            ("prompt".to_string(), json!(self.prompt)),
            (
                "negative_prompt".to_string(),
                json!(self.negative_prompt.as_deref().unwrap_or("")),
            ),
            (
                "lora_path".to_string(),
                json!(self.lora_path.as_deref().unwrap_or("")),
            ),
            ("cfg_scale".to_string(), json!(self.cfg_scale)),
            ("steps".to_string(), json!(self.steps)),
            ("seed".to_string(), json!(seed)),
            ("sampler".to_string(), json!(self.sampler)),
            ("scheduler".to_string(), json!(self.scheduler)),
            ("width".to_string(), json!(self.width)),
            ("height".to_string(), json!(self.height)),
            ("base_model".to_string(), json!(base_model)),
        ])
    }
}

/// Inputs for an image upscale.
#[derive(Debug, Clone, Deserialize)]
pub struct UpscaleParams {
    /// Image reference as understood by the engine's loader node.
    pub image_path: String,
    #[serde(default = "default_upscale_model")]
    pub model_name: String,
    #[serde(default)]
    pub tile_size: u32,
    #[serde(default = "default_upscale_factor")]
    pub upscale_factor: f64,
}

impl UpscaleParams {
    pub fn new(image_path: impl Into<String>) -> Self {
        Self {
            image_path: image_path.into(),
            model_name: DEFAULT_UPSCALE_MODEL.to_string(),
            tile_size: 0,
            upscale_factor: DEFAULT_UPSCALE_FACTOR,
        }
    }

    /// Placeholder values for the upscale template.
    pub fn to_params(&self) -> Params {
        Params::from([
            ("image_path".to_string(), json!(self.image_path)),
            ("model_name".to_string(), json!(self.model_name)),
            ("tile_size".to_string(), json!(self.tile_size)),
            ("upscale_factor".to_string(), json!(self.upscale_factor)),
        ])
    }
}

fn default_cfg_scale() -> f64 {
    DEFAULT_CFG_SCALE
}

fn default_steps() -> u32 {
    DEFAULT_STEPS
}

fn default_sampler() -> String {
    DEFAULT_SAMPLER.to_string()
}

fn default_scheduler() -> String {
    DEFAULT_SCHEDULER.to_string()
}

fn default_dimension() -> u32 {
    DEFAULT_DIMENSION
}

fn default_upscale_model() -> String {
    DEFAULT_UPSCALE_MODEL.to_string()
}

fn default_upscale_factor() -> f64 {
    DEFAULT_UPSCALE_FACTOR
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generation_defaults_from_json() {
        let p: GenerationParams = serde_json::from_str(r#"{"prompt": "a cat"}"#).unwrap();
        assert_eq!(p.cfg_scale, 7.0);
        assert_eq!(p.steps, 30);
        assert_eq!(p.sampler, "euler");
        assert_eq!(p.scheduler, "normal");
        assert_eq!((p.width, p.height), (1024, 1024));
        assert!(p.seed.is_none());
    }

    #[test]
    fn generation_params_cover_all_keys() {
        let params = GenerationParams::new("a cat").to_params("sdxl.safetensors", 42);
        let keys: Vec<_> = params.keys().map(String::as_str).collect();
        assert_eq!(
            keys,
            vec![
                "base_model",
                "cfg_scale",
                "height",
                "lora_path",
                "negative_prompt",
                "prompt",
                "sampler",
                "scheduler",
                "seed",
                "steps",
                "width",
            ]
        );
        assert_eq!(params["negative_prompt"], "");
        assert_eq!(params["seed"], 42);
    }

    #[test]
    fn upscale_defaults_from_json() {
        let p: UpscaleParams = serde_json::from_str(r#"{"image_path": "in.png"}"#).unwrap();
        assert_eq!(p.model_name, DEFAULT_UPSCALE_MODEL);
        assert_eq!(p.tile_size, 0);
        assert_eq!(p.upscale_factor, 2.0);
        assert_eq!(p.to_params().len(), 4);
    }
}
