//! ComfyUI node graphs.
//!
//! Two shapes are accepted:
//!
//! - the **API prompt** (`prompt` chunk): `{ "<id>": { "class_type", "inputs", "_meta" } }`
//!   where a linked input is `["<source id>", <slot>]`;
//! - the **UI workflow** (`workflow` chunk): `{ "nodes": [ { "id", "type", "widgets_values" } ] }`.
//!
//! Both are normalized to a list of [`Node`]s. Prompts are found by following
//! each sampler's `positive`/`negative` links back to a text encoder; when a
//! graph has no resolvable links, text encoders are sorted by their titles.

use serde_json::{Map, Value};
use std::collections::HashMap;

use super::{ParsedGeneration, push_unique, scalar_text};
use crate::container::RawChunkSet;
use crate::detect::DetectedFormat;
use crate::error::{MetadataError, Result};

const GRAPH_KEYWORDS: &[&str] = &["prompt", "workflow"];
const MAX_LINK_DEPTH: usize = 16;
const DEFAULT_OUTPUT_PREFIX: &str = "ComfyUI";
const Z_IMAGE: &str = "z-image";

/// Widget order for UI-workflow nodes, so `widgets_values` can be named.
const WIDGET_NAMES: &[(&str, &[&str])] = &[
    ("KSampler", &["seed", "control_after_generate", "steps", "cfg", "sampler_name", "scheduler", "denoise"]),
    (
        "KSamplerAdvanced",
        &[
            "add_noise", "noise_seed", "control_after_generate", "steps", "cfg", "sampler_name",
            "scheduler", "start_at_step", "end_at_step", "return_with_leftover_noise",
        ],
    ),
    ("CLIPTextEncode", &["text"]),
    ("CLIPTextEncodeFlux", &["clip_l", "t5xxl", "guidance"]),
    ("CheckpointLoaderSimple", &["ckpt_name"]),
    ("UNETLoader", &["unet_name", "weight_dtype"]),
    ("UnetLoaderGGUF", &["unet_name"]),
    ("LoraLoader", &["lora_name", "strength_model", "strength_clip"]),
    ("LoraLoaderModelOnly", &["lora_name", "strength_model"]),
    ("VAELoader", &["vae_name"]),
    ("CLIPLoader", &["clip_name", "type"]),
    ("DualCLIPLoader", &["clip_name1", "clip_name2", "type"]),
    ("TripleCLIPLoader", &["clip_name1", "clip_name2", "clip_name3"]),
    ("EmptyLatentImage", &["width", "height", "batch_size"]),
    ("EmptySD3LatentImage", &["width", "height", "batch_size"]),
    ("EmptySDXLLatentImage", &["width", "height", "batch_size"]),
    ("SaveImage", &["filename_prefix"]),
    ("FluxGuidance", &["guidance"]),
    ("ModelSamplingAuraFlow", &["shift"]),
    ("ModelSamplingSD3", &["shift"]),
    ("RandomNoise", &["noise_seed", "control_after_generate"]),
    ("KSamplerSelect", &["sampler_name"]),
    ("BasicScheduler", &["scheduler", "steps", "denoise"]),
    ("CFGGuider", &["cfg"]),
];

const TEXT_INPUTS: &[&str] = &["text", "text_g", "t5xxl", "clip_l", "text_l", "string", "prompt", "value"];

/// A graph node in either serialization.
#[derive(Debug, Clone)]
struct Node {
    id: String,
    class_type: String,
    title: String,
    inputs: Map<String, Value>,
}

impl Node {
    fn input_str(&self, key: &str) -> Option<&str> {
        self.inputs
            .get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    fn is_text_encoder(&self) -> bool {
        self.class_type.contains("TextEncode")
    }

    fn is_sampler(&self) -> bool {
        self.class_type.contains("Sampler") && !self.class_type.contains("Select")
    }

    fn links(&self) -> impl Iterator<Item = String> + '_ {
        self.inputs.values().filter_map(link_target)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Branch {
    Positive,
    Negative,
}

impl Branch {
    fn input(self) -> &'static str {
        match self {
            Branch::Positive => "positive",
            Branch::Negative => "negative",
        }
    }
}

pub fn is_present(raw: &RawChunkSet) -> bool {
    find_graph(raw).is_some()
}

/// The chunk keyword and JSON text holding the graph.
pub fn locate(raw: &RawChunkSet) -> Option<(String, String)> {
    find_graph(raw).map(|(keyword, text, _)| (keyword.to_string(), text.to_string()))
}

fn find_graph(raw: &RawChunkSet) -> Option<(&'static str, &str, Value)> {
    for &keyword in GRAPH_KEYWORDS {
        for text in raw.all(keyword) {
            let Ok(value) = serde_json::from_str::<Value>(text) else {
                log::debug!("{keyword} chunk is not JSON");
                continue;
            };
            if is_api_graph(&value) || is_ui_workflow(&value) {
                return Some((keyword, text, value));
            }
        }
    }
    None
}

fn is_api_graph(value: &Value) -> bool {
    value.as_object().is_some_and(|nodes| {
        nodes
            .values()
            .any(|node| node.get("class_type").and_then(Value::as_str).is_some())
    })
}

fn is_ui_workflow(value: &Value) -> bool {
    value
        .get("nodes")
        .and_then(Value::as_array)
        .is_some_and(|nodes| {
            nodes
                .iter()
                .any(|n| n.get("type").and_then(Value::as_str).is_some())
        })
}

pub fn parse(raw: &RawChunkSet) -> Result<ParsedGeneration> {
    let (_, text, graph) = find_graph(raw).ok_or_else(|| {
        MetadataError::malformed(DetectedFormat::ComfyUI, "no node graph in prompt or workflow chunks")
    })?;
    let mut parsed = parse_graph(&graph);
    parsed.raw_text = Some(text.to_string());
    Ok(parsed)
}

/// Parse an already-decoded API prompt or UI workflow.
pub fn parse_graph(graph: &Value) -> ParsedGeneration {
    let nodes = if is_api_graph(graph) {
        api_nodes(graph)
    } else {
        ui_nodes(graph)
    };
    summarize(&nodes)
}

/// Node ids sort numerically where possible; subgraph ids like `57:12` sort after.
fn id_order(id: &str) -> (u64, String) {
    (id.parse::<u64>().unwrap_or(u64::MAX), id.to_string())
}

fn api_nodes(graph: &Value) -> Vec<Node> {
    let Some(map) = graph.as_object() else {
        return Vec::new();
    };
    let mut nodes: Vec<Node> = map
        .iter()
        .filter_map(|(id, node)| {
            let class_type = node.get("class_type")?.as_str()?.to_string();
            let title = node
                .get("_meta")
                .and_then(|m| m.get("title"))
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            let inputs = node
                .get("inputs")
                .and_then(Value::as_object)
                .cloned()
                .unwrap_or_default();
            Some(Node {
                id: id.clone(),
                class_type,
                title,
                inputs,
            })
        })
        .collect();
    nodes.sort_by_key(|n| id_order(&n.id));
    nodes
}

fn ui_nodes(workflow: &Value) -> Vec<Node> {
    let Some(list) = workflow.get("nodes").and_then(Value::as_array) else {
        return Vec::new();
    };
    let mut nodes: Vec<Node> = list
        .iter()
        .filter_map(|node| {
            let class_type = node.get("type")?.as_str()?.to_string();
            let id = node.get("id").and_then(scalar_text).unwrap_or_default();
            let title = node
                .get("title")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            let mut inputs = Map::new();
            let names = WIDGET_NAMES
                .iter()
                .find(|(class, _)| *class == class_type)
                .map(|(_, names)| *names);
            if let (Some(names), Some(values)) =
                (names, node.get("widgets_values").and_then(Value::as_array))
            {
                for (name, value) in names.iter().zip(values) {
                    inputs.insert((*name).to_string(), value.clone());
                }
            }
            Some(Node {
                id,
                class_type,
                title,
                inputs,
            })
        })
        .collect();
    nodes.sort_by_key(|n| id_order(&n.id));
    nodes
}

/// `["12", 0]` or `[12, 0]` -> `"12"`.
fn link_target(value: &Value) -> Option<String> {
    let pair = value.as_array()?;
    if pair.len() != 2 || !pair[1].is_number() {
        return None;
    }
    match &pair[0] {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

struct Graph<'a> {
    by_id: HashMap<&'a str, &'a Node>,
}

impl<'a> Graph<'a> {
    fn new(nodes: &'a [Node]) -> Self {
        Self {
            by_id: nodes.iter().map(|n| (n.id.as_str(), n)).collect(),
        }
    }

    fn get(&self, id: &str) -> Option<&'a Node> {
        self.by_id.get(id).copied()
    }

    /// First scalar among `keys` on `node`, then on nodes it links to directly.
    fn scalar(&self, node: &Node, keys: &[&str]) -> Option<String> {
        let direct = keys.iter().find_map(|k| node.inputs.get(*k).and_then(scalar_text));
        if direct.is_some() {
            return direct;
        }
        // Widget converted to an input: follow the link to a primitive node.
        for key in keys {
            if let Some(target) = node.inputs.get(*key).and_then(link_target).and_then(|id| self.get(&id)) {
                let value = keys
                    .iter()
                    .chain(["value", "seed", "int", "float"].iter())
                    .find_map(|k| target.inputs.get(*k).and_then(scalar_text));
                if value.is_some() {
                    return value;
                }
            }
        }
        node.links()
            .filter_map(|id| self.get(&id))
            .find_map(|linked| keys.iter().find_map(|k| linked.inputs.get(*k).and_then(scalar_text)))
    }

    /// Follow a conditioning link back to the text that produced it.
    fn resolve_text(&self, id: &str, branch: Branch, depth: usize) -> Option<String> {
        if depth > MAX_LINK_DEPTH {
            return None;
        }
        let node = self.get(id)?;
        if node.class_type == "ConditioningZeroOut" {
            return None;
        }

        for key in TEXT_INPUTS {
            match node.inputs.get(*key) {
                Some(Value::String(s)) if !s.trim().is_empty() => return Some(s.trim().to_string()),
                Some(v) => {
                    if let Some(text) = link_target(v).and_then(|t| self.resolve_text(&t, branch, depth + 1)) {
                        return Some(text);
                    }
                }
                None => {}
            }
        }

        let pass_through = [
            branch.input(),
            "conditioning",
            "conditioning_1",
            "conditioning_to",
            "conditioning_from",
        ];
        pass_through.iter().find_map(|key| {
            node.inputs
                .get(*key)
                .and_then(link_target)
                .and_then(|t| self.resolve_text(&t, branch, depth + 1))
        })
    }

    /// The node that carries a sampler's conditioning (the sampler or its guider).
    fn conditioning_source(&self, sampler: &'a Node) -> &'a Node {
        if sampler.inputs.contains_key("positive") {
            return sampler;
        }
        sampler
            .inputs
            .get("guider")
            .and_then(link_target)
            .and_then(|id| self.get(&id))
            .unwrap_or(sampler)
    }

    fn branch_text(&self, sampler: &'a Node, branch: Branch) -> Option<String> {
        let source = self.conditioning_source(sampler);
        let keys: &[&str] = match branch {
            Branch::Positive => &["positive", "conditioning"],
            Branch::Negative => &["negative"],
        };
        keys.iter().find_map(|key| {
            source
                .inputs
                .get(*key)
                .and_then(link_target)
                .and_then(|id| self.resolve_text(&id, branch, 0))
        })
    }

    fn branch_is_zeroed(&self, sampler: &'a Node) -> bool {
        let source = self.conditioning_source(sampler);
        let mut next = source.inputs.get("negative").and_then(link_target);
        for _ in 0..MAX_LINK_DEPTH {
            let Some(node) = next.and_then(|id| self.get(&id)) else {
                return false;
            };
            if node.class_type == "ConditioningZeroOut" {
                return true;
            }
            next = node.inputs.get("conditioning").and_then(link_target);
        }
        false
    }
}

#[derive(Default)]
struct Sizes {
    width: Option<String>,
    height: Option<String>,
}

fn summarize(nodes: &[Node]) -> ParsedGeneration {
    let graph = Graph::new(nodes);
    let mut parsed = ParsedGeneration::default();

    let mut positives: Vec<String> = Vec::new();
    let mut negatives: Vec<String> = Vec::new();
    let mut empty_negative = false;

    let mut steps = None;
    let mut cfg = None;
    let mut seed = None;
    let mut sampler_name = None;
    let mut scheduler = None;
    let mut denoise = None;
    let mut guidance = None;
    let mut size = Sizes::default();
    let mut model = None;
    let mut lora_entries: Vec<String> = Vec::new();
    let mut vae = None;
    let mut clip = None;
    let mut shift = None;
    let mut output_prefix: Option<String> = None;

    for node in nodes {
        push_unique(&mut parsed.node_types, &node.class_type);
        let class = node.class_type.as_str();

        if node.is_sampler() {
            steps = steps.or_else(|| graph.scalar(node, &["steps"]));
            cfg = cfg.or_else(|| graph.scalar(node, &["cfg"]));
            seed = seed.or_else(|| graph.scalar(node, &["seed", "noise_seed"]));
            sampler_name = sampler_name.or_else(|| graph.scalar(node, &["sampler_name"]));
            scheduler = scheduler.or_else(|| graph.scalar(node, &["scheduler"]));
            denoise = denoise.or_else(|| graph.scalar(node, &["denoise"]));

            if let Some(text) = graph.branch_text(node, Branch::Positive) {
                push_unique(&mut positives, &text);
            }
            if let Some(text) = graph.branch_text(node, Branch::Negative) {
                push_unique(&mut negatives, &text);
            }
            empty_negative |= graph.branch_is_zeroed(node);
        }

        if class.contains("CheckpointLoader") || class.starts_with("UNETLoader") || class.starts_with("UnetLoader") {
            if let Some(name) = node.input_str("ckpt_name").or_else(|| node.input_str("unet_name")) {
                push_unique(&mut parsed.models, name);
                model.get_or_insert_with(|| name.to_string());
            }
        }

        if class.contains("LoraLoader") {
            if let Some(name) = node.input_str("lora_name") {
                push_unique(&mut parsed.loras, name);
                let strength = node
                    .inputs
                    .get("strength_model")
                    .or_else(|| node.inputs.get("strength"))
                    .and_then(scalar_text)
                    .unwrap_or_else(|| "1.0".to_string());
                lora_entries.push(format!("{name} ({strength})"));
            }
        }

        if class == "VAELoader" {
            vae = vae.or_else(|| node.input_str("vae_name").map(str::to_string));
        }

        if class.contains("CLIPLoader") {
            for key in ["clip_name", "clip_name1", "clip_name2", "clip_name3"] {
                if let Some(name) = node.input_str(key) {
                    push_unique(&mut parsed.text_encoders, name);
                }
            }
            clip = clip.or_else(|| (!parsed.text_encoders.is_empty()).then(|| parsed.text_encoders.join(", ")));
        }

        if class.starts_with("Empty") && class.contains("LatentImage") && size.width.is_none() {
            size.width = graph.scalar(node, &["width"]);
            size.height = graph.scalar(node, &["height"]);
        }

        if class == "SaveImage" || class == "Image Save" {
            output_prefix = output_prefix.or_else(|| node.input_str("filename_prefix").map(str::to_string));
        }

        if class == "FluxGuidance" || class == "CLIPTextEncodeFlux" {
            guidance = guidance.or_else(|| graph.scalar(node, &["guidance"]));
        }

        if class.contains("ModelSampling") {
            shift = shift.or_else(|| graph.scalar(node, &["shift"]));
        }

        if class == "ConditioningZeroOut" && !nodes.iter().any(Node::is_sampler) {
            empty_negative = true;
        }
    }

    if positives.is_empty() && negatives.is_empty() {
        for node in nodes.iter().filter(|n| n.is_text_encoder()) {
            let Some(text) = TEXT_INPUTS.iter().find_map(|k| node.input_str(k)) else {
                continue;
            };
            let title = node.title.to_lowercase();
            if title.contains("negative") || title.contains("neg") {
                push_unique(&mut negatives, text);
            } else {
                push_unique(&mut positives, text);
            }
        }
    }

    parsed.prompt = positives.first().cloned();
    parsed.negative_prompt = negatives.first().cloned();

    let params = &mut parsed.parameters;
    params.push("Steps", steps.unwrap_or_default());
    params.push("CFG scale", cfg.unwrap_or_default());
    params.push("Guidance", guidance.unwrap_or_default());
    params.push("Seed", seed.unwrap_or_default());
    params.push("Sampler", sampler_name.unwrap_or_default());
    params.push("Scheduler", scheduler.unwrap_or_default());
    params.push("Denoise", denoise.unwrap_or_default());
    if let (Some(w), Some(h)) = (size.width, size.height) {
        params.push("Size", format!("{w}x{h}"));
    }
    params.push("Model", model.unwrap_or_default());
    for entry in lora_entries {
        params.push("LoRA", entry);
    }
    params.push("VAE", vae.unwrap_or_default());
    params.push("CLIP", clip.unwrap_or_default());
    params.push("Shift", shift.unwrap_or_default());
    params.push("Output prefix", output_prefix.clone().unwrap_or_default());
    if positives.len() > 1 {
        params.push("Additional prompts", (positives.len() - 1).to_string());
    }
    if empty_negative {
        params.push("Empty negative", "true");
    }

    parsed.variant = variant(output_prefix.as_deref(), &parsed.models, nodes);
    parsed
}

/// Producer variant from the output filename prefix, or a z-image model/subgraph.
fn variant(output_prefix: Option<&str>, models: &[String], nodes: &[Node]) -> Option<String> {
    if let Some(prefix) = output_prefix {
        let head = prefix.split(['/', '\\']).next().unwrap_or(prefix).trim();
        if !head.is_empty() && !head.eq_ignore_ascii_case(DEFAULT_OUTPUT_PREFIX) {
            return Some(head.to_string());
        }
    }
    let is_z_image = |s: &str| {
        let lower = s.to_lowercase();
        lower.contains("z-image") || lower.contains("z_image") || lower.contains("zimage")
    };
    if models.iter().any(|m| is_z_image(m)) || nodes.iter().any(|n| is_z_image(&n.id)) {
        return Some(Z_IMAGE.to_string());
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::{ContainerKind, TextOrigin};
    use serde_json::json;

    fn api_graph() -> Value {
        json!({
            "3": {
                "class_type": "KSampler",
                "inputs": {
                    "seed": 8566257, "steps": 20, "cfg": 8, "sampler_name": "euler",
                    "scheduler": "normal", "denoise": 1,
                    "model": ["10", 0], "positive": ["6", 0], "negative": ["7", 0],
                    "latent_image": ["5", 0]
                }
            },
            "4": { "class_type": "CheckpointLoaderSimple", "inputs": { "ckpt_name": "v1-5-pruned-emaonly.safetensors" } },
            "5": { "class_type": "EmptyLatentImage", "inputs": { "width": 512, "height": 768, "batch_size": 1 } },
            "6": {
                "class_type": "CLIPTextEncode",
                "_meta": { "title": "Prompt" },
                "inputs": { "text": "masterpiece, a lighthouse at dusk", "clip": ["10", 1] }
            },
            "7": {
                "class_type": "CLIPTextEncode",
                "_meta": { "title": "Prompt" },
                "inputs": { "text": "lowres, watermark", "clip": ["10", 1] }
            },
            "9": { "class_type": "SaveImage", "inputs": { "filename_prefix": "ComfyUI", "images": ["8", 0] } },
            "10": {
                "class_type": "LoraLoader",
                "inputs": {
                    "lora_name": "film_grain.safetensors", "strength_model": 0.8,
                    "strength_clip": 1, "model": ["4", 0], "clip": ["4", 1]
                }
            }
        })
    }

    fn raw_with(keyword: &str, value: &Value) -> RawChunkSet {
        let mut raw = RawChunkSet::new(ContainerKind::Png);
        raw.push_text(keyword, value.to_string(), TextOrigin::PngText);
        raw
    }

    #[test]
    fn follows_sampler_links_for_prompts() {
        let parsed = parse_graph(&api_graph());
        // Both encoders share a title; only the links tell them apart.
        assert_eq!(parsed.prompt.as_deref(), Some("masterpiece, a lighthouse at dusk"));
        assert_eq!(parsed.negative_prompt.as_deref(), Some("lowres, watermark"));
    }

    #[test]
    fn collects_sampler_parameters_in_order() {
        let parsed = parse_graph(&api_graph());
        let keys: Vec<_> = parsed.parameters.iter().map(|p| p.key.as_str()).collect();
        assert_eq!(
            keys,
            ["Steps", "CFG scale", "Seed", "Sampler", "Scheduler", "Denoise", "Size", "Model", "LoRA", "Output prefix"]
        );
        assert_eq!(parsed.parameters.get("Seed"), Some("8566257"));
        assert_eq!(parsed.parameters.get("Size"), Some("512x768"));
        assert_eq!(parsed.parameters.get("LoRA"), Some("film_grain.safetensors (0.8)"));
        assert_eq!(parsed.models, ["v1-5-pruned-emaonly.safetensors"]);
        assert_eq!(parsed.loras, ["film_grain.safetensors"]);
        assert!(parsed.variant.is_none());
    }

    #[test]
    fn title_fallback_without_links() {
        let graph = json!({
            "1": { "class_type": "CLIPTextEncode", "_meta": { "title": "Negative" }, "inputs": { "text": "ugly" } },
            "2": { "class_type": "CLIPTextEncode", "_meta": { "title": "Positive" }, "inputs": { "text": "a cute cat" } },
            "3": { "class_type": "CLIPTextEncode", "_meta": { "title": "Style" }, "inputs": { "text": "watercolor" } }
        });
        let parsed = parse_graph(&graph);
        assert_eq!(parsed.prompt.as_deref(), Some("a cute cat"));
        assert_eq!(parsed.negative_prompt.as_deref(), Some("ugly"));
        assert_eq!(parsed.parameters.get("Additional prompts"), Some("1"));
    }

    #[test]
    fn zero_out_negative_and_z_image_prefix() {
        let graph = json!({
            "1": { "class_type": "UNETLoader", "inputs": { "unet_name": "z_image_turbo_bf16.safetensors", "weight_dtype": "default" } },
            "2": { "class_type": "CLIPLoader", "inputs": { "clip_name": "qwen_3_4b.safetensors", "type": "lumina2" } },
            "3": { "class_type": "CLIPTextEncode", "inputs": { "text": "a red fox in snow", "clip": ["2", 0] } },
            "4": { "class_type": "ConditioningZeroOut", "inputs": { "conditioning": ["3", 0] } },
            "5": { "class_type": "ModelSamplingAuraFlow", "inputs": { "shift": 3, "model": ["1", 0] } },
            "6": {
                "class_type": "KSampler",
                "inputs": {
                    "seed": 42, "steps": 9, "cfg": 1, "sampler_name": "res_multistep", "scheduler": "simple",
                    "denoise": 1, "model": ["5", 0], "positive": ["3", 0], "negative": ["4", 0]
                }
            },
            "7": { "class_type": "SaveImage", "inputs": { "filename_prefix": "z-image/2025-01-01", "images": ["8", 0] } }
        });
        let parsed = parse_graph(&graph);
        assert_eq!(parsed.prompt.as_deref(), Some("a red fox in snow"));
        assert!(parsed.negative_prompt.is_none());
        assert_eq!(parsed.parameters.get("Empty negative"), Some("true"));
        assert_eq!(parsed.parameters.get("Shift"), Some("3"));
        assert_eq!(parsed.parameters.get("CLIP"), Some("qwen_3_4b.safetensors"));
        assert_eq!(parsed.variant.as_deref(), Some("z-image"));
    }

    #[test]
    fn custom_sampler_reads_linked_nodes() {
        let graph = json!({
            "10": { "class_type": "RandomNoise", "inputs": { "noise_seed": 777 } },
            "11": { "class_type": "KSamplerSelect", "inputs": { "sampler_name": "euler" } },
            "12": { "class_type": "BasicScheduler", "inputs": { "scheduler": "beta", "steps": 28, "denoise": 1, "model": ["20", 0] } },
            "13": { "class_type": "CLIPTextEncode", "inputs": { "text": "city skyline at night", "clip": ["21", 0] } },
            "14": { "class_type": "FluxGuidance", "inputs": { "guidance": 3.5, "conditioning": ["13", 0] } },
            "15": { "class_type": "BasicGuider", "inputs": { "conditioning": ["14", 0], "model": ["20", 0] } },
            "16": {
                "class_type": "SamplerCustomAdvanced",
                "inputs": { "noise": ["10", 0], "guider": ["15", 0], "sampler": ["11", 0], "sigmas": ["12", 0], "latent_image": ["22", 0] }
            },
            "20": { "class_type": "UNETLoader", "inputs": { "unet_name": "flux1-dev.safetensors" } }
        });
        let parsed = parse_graph(&graph);
        assert_eq!(parsed.prompt.as_deref(), Some("city skyline at night"));
        assert_eq!(parsed.parameters.get("Seed"), Some("777"));
        assert_eq!(parsed.parameters.get("Steps"), Some("28"));
        assert_eq!(parsed.parameters.get("Sampler"), Some("euler"));
        assert_eq!(parsed.parameters.get("Guidance"), Some("3.5"));
        assert!(parsed.node_types.iter().any(|t| t == "SamplerCustomAdvanced"));
    }

    #[test]
    fn ui_workflow_widgets() {
        let workflow = json!({
            "last_node_id": 9,
            "nodes": [
                { "id": 3, "type": "KSampler", "widgets_values": [156680208700286_u64, "randomize", 20, 8, "euler", "normal", 1] },
                { "id": 6, "type": "CLIPTextEncode", "title": "Positive", "widgets_values": ["beautiful scenery"] },
                { "id": 7, "type": "CLIPTextEncode", "title": "Negative", "widgets_values": ["text, watermark"] },
                { "id": 4, "type": "CheckpointLoaderSimple", "widgets_values": ["sd_xl_base_1.0.safetensors"] }
            ]
        });
        let parsed = parse_graph(&workflow);
        assert_eq!(parsed.prompt.as_deref(), Some("beautiful scenery"));
        assert_eq!(parsed.negative_prompt.as_deref(), Some("text, watermark"));
        assert_eq!(parsed.parameters.get("Steps"), Some("20"));
        assert_eq!(parsed.parameters.get("Seed"), Some("156680208700286"));
        assert_eq!(parsed.models, ["sd_xl_base_1.0.safetensors"]);
    }

    #[test]
    fn prompt_chunk_wins_over_workflow() {
        let mut raw = raw_with("workflow", &json!({ "nodes": [ { "id": 1, "type": "SaveImage" } ] }));
        raw.push_text("prompt", api_graph().to_string(), TextOrigin::PngText);
        let (keyword, _) = locate(&raw).unwrap();
        assert_eq!(keyword, "prompt");
    }

    #[test]
    fn skips_duplicate_non_graph_chunks() {
        let mut raw = raw_with("prompt", &json!("plain string"));
        raw.push_text("prompt", api_graph().to_string(), TextOrigin::PngText);
        assert!(is_present(&raw));
        let parsed = parse(&raw).unwrap();
        assert!(parsed.raw_text.unwrap().contains("KSampler"));
    }

    #[test]
    fn string_node_ids() {
        let graph = json!({
            "57:3": { "class_type": "KSampler", "inputs": { "steps": 4, "positive": ["57:6", 0], "negative": ["57:7", 0] } },
            "57:6": { "class_type": "CLIPTextEncode", "inputs": { "text": "moody portrait" } },
            "57:7": { "class_type": "CLIPTextEncode", "inputs": { "text": "" } }
        });
        let parsed = parse_graph(&graph);
        assert_eq!(parsed.prompt.as_deref(), Some("moody portrait"));
        assert!(parsed.negative_prompt.is_none());
    }
}
