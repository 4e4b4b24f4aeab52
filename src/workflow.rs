use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Default clip length in frames (about five seconds at 24 fps).
pub const DEFAULT_FRAMES: u32 = 121;
/// Default frame rate.
pub const DEFAULT_FPS: u32 = 24;

/// Save node whose history entry carries the rendered file.
pub const SAVE_NODE: &str = "75";
/// Text encoder receiving the user prompt.
pub const POSITIVE_PROMPT_NODE: &str = "92:3";
/// Noise source for the base-resolution pass.
pub const BASE_NOISE_NODE: &str = "92:11";
/// Noise source for the upscale-and-refine pass.
pub const REFINE_NOISE_NODE: &str = "92:67";
/// Integer primitive holding the frame count.
pub const FRAME_COUNT_NODE: &str = "92:62";
/// Integer primitive holding the frame rate (audio latent).
pub const FPS_INT_NODE: &str = "92:99";
/// Float primitive holding the frame rate (conditioning and muxing).
pub const FPS_FLOAT_NODE: &str = "92:102";

const CHECKPOINT: &str = "ltx-2-19b-dev-fp4.safetensors";
const NEGATIVE_PROMPT: &str =
    "blurry, low quality, still frame, frames, watermark, overlay, titles, has blurbox, has subtitles";

/// A single node input: either a literal or a link to another node's output slot.
///
/// Links serialize as ComfyUI's two-element array, e.g. `["92:97", 0]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum InputValue {
    Link(String, u32),
    Int(i64),
    Float(f64),
    Text(String),
    Bool(bool),
}

impl InputValue {
    /// Returns the `(node_id, slot)` pair if this input is a link.
    pub fn as_link(&self) -> Option<(&str, u32)> {
        match self {
            InputValue::Link(id, slot) => Some((id.as_str(), *slot)),
            _ => None,
        }
    }
}

/// One processing step in the workflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeSpec {
    pub inputs: BTreeMap<String, InputValue>,
    pub class_type: String,
}

impl NodeSpec {
    pub fn input(&self, name: &str) -> Option<&InputValue> {
        self.inputs.get(name)
    }
}

/// API-format ComfyUI workflow: node id → node.
///
/// Serializes to the object expected in the `prompt` field of `/api/prompt`,
/// with node ids in sorted order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkflowGraph {
    nodes: BTreeMap<String, NodeSpec>,
}

impl WorkflowGraph {
    pub fn node(&self, id: &str) -> Option<&NodeSpec> {
        self.nodes.get(id)
    }

    pub fn nodes(&self) -> impl Iterator<Item = (&str, &NodeSpec)> {
        self.nodes.iter().map(|(id, node)| (id.as_str(), node))
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Numeric parameters substituted into the template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkflowParams {
    pub seed: u32,
    pub frame_count: u32,
    pub fps: u32,
}

impl WorkflowParams {
    /// Seed for the refinement pass, one above the base seed.
    pub fn refine_seed(&self) -> u64 {
        u64::from(self.seed) + 1
    }
}

// ── Template ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
enum Param {
    Prompt,
    Seed,
    RefineSeed,
    FrameCount,
    FpsInt,
    FpsFloat,
}

#[derive(Debug, Clone, Copy)]
enum Tmpl {
    Link(&'static str, u32),
    Int(i64),
    Float(f64),
    Text(&'static str),
    Bool(bool),
    Param(Param),
}

struct TemplateNode {
    id: &'static str,
    class_type: &'static str,
    inputs: &'static [(&'static str, Tmpl)],
}

use Tmpl::{Bool, Float, Int, Link, Text};

/// LTX-2 two-pass text-to-video graph: base generation at half resolution,
/// then latent upscale and a short distilled refinement pass, then decode and
/// mux with generated audio.
const LTX2_TEMPLATE: &[TemplateNode] = &[
    // Loaders
    TemplateNode {
        id: "92:1",
        class_type: "CheckpointLoaderSimple",
        inputs: &[("ckpt_name", Text(CHECKPOINT))],
    },
    TemplateNode {
        id: "92:48",
        class_type: "LTXVAudioVAELoader",
        inputs: &[("ckpt_name", Text(CHECKPOINT))],
    },
    TemplateNode {
        id: "92:60",
        class_type: "LTXAVTextEncoderLoader",
        inputs: &[
            ("text_encoder", Text("gemma_3_12B_it_fp4_mixed.safetensors")),
            ("ckpt_name", Text(CHECKPOINT)),
            ("device", Text("default")),
        ],
    },
    TemplateNode {
        id: "92:76",
        class_type: "LatentUpscaleModelLoader",
        inputs: &[("model_name", Text("ltx-2-spatial-upscaler-x2-1.0.safetensors"))],
    },
    TemplateNode {
        id: "92:68",
        class_type: "LoraLoaderModelOnly",
        inputs: &[
            ("lora_name", Text("ltx-2-19b-distilled-lora-384.safetensors")),
            ("strength_model", Int(1)),
            ("model", Link("92:1", 0)),
        ],
    },
    // Parameters
    TemplateNode {
        id: "92:62",
        class_type: "PrimitiveInt",
        inputs: &[("value", Tmpl::Param(Param::FrameCount))],
    },
    TemplateNode {
        id: "92:99",
        class_type: "PrimitiveInt",
        inputs: &[("value", Tmpl::Param(Param::FpsInt))],
    },
    TemplateNode {
        id: "92:102",
        class_type: "PrimitiveFloat",
        inputs: &[("value", Tmpl::Param(Param::FpsFloat))],
    },
    // Conditioning
    TemplateNode {
        id: "92:3",
        class_type: "CLIPTextEncode",
        inputs: &[("text", Tmpl::Param(Param::Prompt)), ("clip", Link("92:60", 0))],
    },
    TemplateNode {
        id: "92:4",
        class_type: "CLIPTextEncode",
        inputs: &[("text", Text(NEGATIVE_PROMPT)), ("clip", Link("92:60", 0))],
    },
    TemplateNode {
        id: "92:22",
        class_type: "LTXVConditioning",
        inputs: &[
            ("frame_rate", Link("92:102", 0)),
            ("positive", Link("92:3", 0)),
            ("negative", Link("92:4", 0)),
        ],
    },
    // Latent sizing (512x512 canvas scaled by 0.5)
    TemplateNode {
        id: "92:89",
        class_type: "EmptyImage",
        inputs: &[
            ("width", Int(512)),
            ("height", Int(512)),
            ("batch_size", Int(1)),
            ("color", Int(0)),
        ],
    },
    TemplateNode {
        id: "92:90",
        class_type: "ImageScaleBy",
        inputs: &[
            ("upscale_method", Text("lanczos")),
            ("scale_by", Float(0.5)),
            ("image", Link("92:89", 0)),
        ],
    },
    TemplateNode {
        id: "92:91",
        class_type: "GetImageSize",
        inputs: &[("image", Link("92:90", 0))],
    },
    TemplateNode {
        id: "92:43",
        class_type: "EmptyLTXVLatentVideo",
        inputs: &[
            ("width", Link("92:91", 0)),
            ("height", Link("92:91", 1)),
            ("length", Link("92:62", 0)),
            ("batch_size", Int(1)),
        ],
    },
    TemplateNode {
        id: "92:51",
        class_type: "LTXVEmptyLatentAudio",
        inputs: &[
            ("frames_number", Link("92:62", 0)),
            ("frame_rate", Link("92:99", 0)),
            ("batch_size", Int(1)),
            ("audio_vae", Link("92:48", 0)),
        ],
    },
    TemplateNode {
        id: "92:56",
        class_type: "LTXVConcatAVLatent",
        inputs: &[
            ("video_latent", Link("92:43", 0)),
            ("audio_latent", Link("92:51", 0)),
        ],
    },
    // Base pass
    TemplateNode {
        id: "92:11",
        class_type: "RandomNoise",
        inputs: &[("noise_seed", Tmpl::Param(Param::Seed))],
    },
    TemplateNode {
        id: "92:8",
        class_type: "KSamplerSelect",
        inputs: &[("sampler_name", Text("euler_ancestral"))],
    },
    TemplateNode {
        id: "92:9",
        class_type: "LTXVScheduler",
        inputs: &[
            ("steps", Int(20)),
            ("max_shift", Float(2.05)),
            ("base_shift", Float(0.95)),
            ("stretch", Bool(true)),
            ("terminal", Float(0.1)),
            ("latent", Link("92:56", 0)),
        ],
    },
    TemplateNode {
        id: "92:47",
        class_type: "CFGGuider",
        inputs: &[
            ("cfg", Int(4)),
            ("model", Link("92:1", 0)),
            ("positive", Link("92:22", 0)),
            ("negative", Link("92:22", 1)),
        ],
    },
    TemplateNode {
        id: "92:41",
        class_type: "SamplerCustomAdvanced",
        inputs: &[
            ("noise", Link("92:11", 0)),
            ("guider", Link("92:47", 0)),
            ("sampler", Link("92:8", 0)),
            ("sigmas", Link("92:9", 0)),
            ("latent_image", Link("92:56", 0)),
        ],
    },
    // Upscale and refine
    TemplateNode {
        id: "92:80",
        class_type: "LTXVSeparateAVLatent",
        inputs: &[("av_latent", Link("92:41", 0))],
    },
    TemplateNode {
        id: "92:81",
        class_type: "LTXVCropGuides",
        inputs: &[
            ("positive", Link("92:22", 0)),
            ("negative", Link("92:22", 1)),
            ("latent", Link("92:80", 0)),
        ],
    },
    TemplateNode {
        id: "92:84",
        class_type: "LTXVLatentUpsampler",
        inputs: &[
            ("samples", Link("92:81", 2)),
            ("upscale_model", Link("92:76", 0)),
            ("vae", Link("92:1", 2)),
        ],
    },
    TemplateNode {
        id: "92:83",
        class_type: "LTXVConcatAVLatent",
        inputs: &[
            ("video_latent", Link("92:84", 0)),
            ("audio_latent", Link("92:80", 1)),
        ],
    },
    TemplateNode {
        id: "92:67",
        class_type: "RandomNoise",
        inputs: &[("noise_seed", Tmpl::Param(Param::RefineSeed))],
    },
    TemplateNode {
        id: "92:66",
        class_type: "KSamplerSelect",
        inputs: &[("sampler_name", Text("euler_ancestral"))],
    },
    TemplateNode {
        id: "92:73",
        class_type: "ManualSigmas",
        inputs: &[("sigmas", Text("0.909375, 0.725, 0.421875, 0.0"))],
    },
    TemplateNode {
        id: "92:82",
        class_type: "CFGGuider",
        inputs: &[
            ("cfg", Int(1)),
            ("model", Link("92:68", 0)),
            ("positive", Link("92:81", 0)),
            ("negative", Link("92:81", 1)),
        ],
    },
    TemplateNode {
        id: "92:70",
        class_type: "SamplerCustomAdvanced",
        inputs: &[
            ("noise", Link("92:67", 0)),
            ("guider", Link("92:82", 0)),
            ("sampler", Link("92:66", 0)),
            ("sigmas", Link("92:73", 0)),
            ("latent_image", Link("92:83", 0)),
        ],
    },
    // Decode and save
    TemplateNode {
        id: "92:94",
        class_type: "LTXVSeparateAVLatent",
        inputs: &[("av_latent", Link("92:70", 1))],
    },
    TemplateNode {
        id: "92:98",
        class_type: "VAEDecodeTiled",
        inputs: &[
            ("tile_size", Int(512)),
            ("overlap", Int(64)),
            ("temporal_size", Int(4096)),
            ("temporal_overlap", Int(8)),
            ("samples", Link("92:94", 0)),
            ("vae", Link("92:1", 2)),
        ],
    },
    TemplateNode {
        id: "92:96",
        class_type: "LTXVAudioVAEDecode",
        inputs: &[
            ("samples", Link("92:94", 1)),
            ("audio_vae", Link("92:48", 0)),
        ],
    },
    TemplateNode {
        id: "92:97",
        class_type: "CreateVideo",
        inputs: &[
            ("fps", Link("92:102", 0)),
            ("images", Link("92:98", 0)),
            ("audio", Link("92:96", 0)),
        ],
    },
    TemplateNode {
        id: "75",
        class_type: "SaveVideo",
        inputs: &[
            ("filename_prefix", Text("video/LTX-2")),
            ("format", Text("mp4")),
            ("codec", Text("auto")),
            ("video", Link("92:97", 0)),
        ],
    },
];

fn resolve(value: Tmpl, prompt: &str, params: &WorkflowParams) -> InputValue {
    match value {
        Tmpl::Link(id, slot) => InputValue::Link(id.to_string(), slot),
        Tmpl::Int(v) => InputValue::Int(v),
        Tmpl::Float(v) => InputValue::Float(v),
        Tmpl::Text(v) => InputValue::Text(v.to_string()),
        Tmpl::Bool(v) => InputValue::Bool(v),
        Tmpl::Param(Param::Prompt) => InputValue::Text(prompt.to_string()),
        Tmpl::Param(Param::Seed) => InputValue::Int(i64::from(params.seed)),
        Tmpl::Param(Param::RefineSeed) => InputValue::Int(params.refine_seed() as i64),
        Tmpl::Param(Param::FrameCount) => InputValue::Int(i64::from(params.frame_count)),
        Tmpl::Param(Param::FpsInt) => InputValue::Int(i64::from(params.fps)),
        Tmpl::Param(Param::FpsFloat) => InputValue::Float(f64::from(params.fps)),
    }
}

/// Fill the LTX-2 template with a prompt and numeric parameters.
///
/// The node ids, class types and links never change; only the prompt text,
/// the two noise seeds, the frame count and the two frame-rate primitives
/// vary between calls.
pub fn build(prompt: &str, params: &WorkflowParams) -> WorkflowGraph {
    let nodes = LTX2_TEMPLATE
        .iter()
        .map(|node| {
            let inputs = node
                .inputs
                .iter()
                .map(|(name, value)| (name.to_string(), resolve(*value, prompt, params)))
                .collect();
            (
                node.id.to_string(),
                NodeSpec {
                    inputs,
                    class_type: node.class_type.to_string(),
                },
            )
        })
        .collect();
    WorkflowGraph { nodes }
}

/// Builder for an LTX-2 text-to-video workflow.
///
/// # Example
/// ```
/// use comfy_cloud_video::LtxVideoRequest;
///
/// let (workflow, seed) = LtxVideoRequest::new("a cat playing piano")
///     .seed(42)
///     .frames(97)
///     .fps(24)
///     .build();
///
/// assert_eq!(seed, 42);
/// assert!(workflow.node("75").is_some()); // SaveVideo node
/// ```
#[derive(Debug, Clone)]
pub struct LtxVideoRequest {
    pub prompt: String,
    pub seed: Option<u32>,
    pub frame_count: u32,
    pub fps: u32,
}

impl LtxVideoRequest {
    /// Create a request with the default clip length (121 frames at 24 fps)
    /// and a random seed.
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            seed: None,
            frame_count: DEFAULT_FRAMES,
            fps: DEFAULT_FPS,
        }
    }

    /// Set a specific seed. Without one, `build` draws a random seed.
    pub fn seed(mut self, seed: u32) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Set the number of frames to generate.
    pub fn frames(mut self, frames: u32) -> Self {
        self.frame_count = frames;
        self
    }

    /// Set the output frame rate.
    pub fn fps(mut self, fps: u32) -> Self {
        self.fps = fps;
        self
    }

    /// Build the workflow and resolve the seed.
    ///
    /// Returns `(workflow, actual_seed)` so a random seed can be reported.
    pub fn build(&self) -> (WorkflowGraph, u32) {
        let seed = self.seed.unwrap_or_else(|| rand::rng().random());
        let params = WorkflowParams {
            seed,
            frame_count: self.frame_count,
            fps: self.fps,
        };
        (build(&self.prompt, &params), seed)
    }
}
