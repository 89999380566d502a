//! Known CLIP models and the size of the embeddings they produce

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ClipModel {
	pub name: &'static str,
	pub dimension: u32,
}

const fn model(name: &'static str, dimension: u32) -> ClipModel {
	ClipModel { name, dimension }
}

pub const CLIP_MODELS: &[ClipModel] = &[
	model("RN50__openai", 1024),
	model("RN50__yfcc15m", 1024),
	model("RN50__cc12m", 1024),
	model("RN101__openai", 512),
	model("RN101__yfcc15m", 512),
	model("RN50x4__openai", 640),
	model("RN50x16__openai", 768),
	model("RN50x64__openai", 1024),
	model("ViT-B-32__openai", 512),
	model("ViT-B-32__laion2b_e16", 512),
	model("ViT-B-32__laion400m_e31", 512),
	model("ViT-B-32__laion400m_e32", 512),
	model("ViT-B-32__laion2b-s34b-b79k", 512),
	model("ViT-B-16__openai", 512),
	model("ViT-B-16__laion400m_e31", 512),
	model("ViT-B-16__laion400m_e32", 512),
	model("ViT-B-16-plus-240__laion400m_e31", 640),
	model("ViT-B-16-plus-240__laion400m_e32", 640),
	model("ViT-B-16-SigLIP__webli", 768),
	model("ViT-B-16-SigLIP-256__webli", 768),
	model("ViT-B-16-SigLIP-384__webli", 768),
	model("ViT-L-14__openai", 768),
	model("ViT-L-14-336__openai", 768),
	model("ViT-L-14__laion400m_e31", 768),
	model("ViT-L-14__laion400m_e32", 768),
	model("ViT-L-14__laion2b-s32b-b82k", 768),
	model("ViT-L-16-SigLIP-256__webli", 1024),
	model("ViT-L-16-SigLIP-384__webli", 1024),
	model("ViT-H-14__laion2b-s32b-b79k", 1024),
	model("ViT-H-14-378-quickgelu__dfn5b", 1024),
	model("ViT-g-14__laion2b-s12b-b42k", 1024),
	model("ViT-SO400M-14-SigLIP-384__webli", 1152),
	model("LABSE-Vit-L-14", 768),
	model("XLM-Roberta-Base-ViT-B-32__laion5b_s13b_b90k", 512),
	model("XLM-Roberta-Large-ViT-H-14__frozen_laion5b_s13b_b90k", 1024),
	model("XLM-Roberta-Large-Vit-B-16Plus", 640),
	model("XLM-Roberta-Large-Vit-B-32", 512),
	model("XLM-Roberta-Large-Vit-L-14", 768),
	model("nllb-clip-base-siglip__v1", 768),
	model("nllb-clip-base-siglip__mrl", 768),
	model("nllb-clip-large-siglip__v1", 1152),
	model("nllb-clip-large-siglip__mrl", 1152),
];

/// Embedding dimension produced by `model_name`.
///
/// Names may carry an organisation prefix (`immich-app/ViT-B-32__openai`) and
/// are compared case insensitively.
pub fn clip_dimension(model_name: &str) -> Option<u32> {
	let name = model_name.trim();
	let name = name.rsplit('/').next().unwrap_or(name);

	CLIP_MODELS
		.iter()
		.find(|model| model.name.eq_ignore_ascii_case(name))
		.map(|model| model.dimension)
}
