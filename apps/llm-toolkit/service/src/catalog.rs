//! Static catalog of fine-tunable base models.

use serde::{Deserialize, Serialize};

use crate::training::FineTuneType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelSource {
    Jumpstart,
    Huggingface,
}

impl ModelSource {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Jumpstart => "jumpstart",
            Self::Huggingface => "huggingface",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelDescriptor {
    pub id: &'static str,
    pub name: &'static str,
    pub provider: &'static str,
    pub source: ModelSource,
    pub model_id: &'static str,
    pub description: &'static str,
    pub parameter_count: &'static str,
    pub context_length: u32,
    pub license: &'static str,
    pub supported_fine_tune_types: &'static [FineTuneType],
    pub recommended_instance: &'static str,
    pub min_gpu_memory_gb: u32,
    pub estimated_cost_per_hour: f64,
    pub tags: &'static [&'static str],
}

/// Optional predicates; the ones present are ANDed together.
///
/// `source` and `fine_tune_type` are compared by wire name, so an unknown
/// value matches nothing and an empty one is ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ModelFilter {
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub min_context_length: Option<u32>,
    #[serde(default)]
    pub max_cost: Option<f64>,
    #[serde(default)]
    pub fine_tune_type: Option<String>,
}

impl ModelFilter {
    pub fn matches(&self, model: &ModelDescriptor) -> bool {
        requested(&self.source).is_none_or(|source| model.source.as_str() == source)
            && self
                .min_context_length
                .is_none_or(|min| model.context_length >= min)
            && self
                .max_cost
                .is_none_or(|max| model.estimated_cost_per_hour <= max)
            && requested(&self.fine_tune_type).is_none_or(|kind| {
                model
                    .supported_fine_tune_types
                    .iter()
                    .any(|supported| supported.as_str() == kind)
            })
    }
}

fn requested(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|value| !value.is_empty())
}

const ALL_FINE_TUNE_TYPES: &[FineTuneType] =
    &[FineTuneType::Full, FineTuneType::Lora, FineTuneType::Qlora];
const ADAPTER_FINE_TUNE_TYPES: &[FineTuneType] = &[FineTuneType::Lora, FineTuneType::Qlora];

const MODEL_CATALOG: &[ModelDescriptor] = &[
    ModelDescriptor {
        id: "llama-3-8b",
        name: "Llama 3 8B",
        provider: "Meta",
        source: ModelSource::Jumpstart,
        model_id: "meta-textgeneration-llama-3-8b",
        description: "Meta's latest open LLM, excellent for instruction following and chat applications.",
        parameter_count: "8B",
        context_length: 8192,
        license: "Llama 3 Community License",
        supported_fine_tune_types: ALL_FINE_TUNE_TYPES,
        recommended_instance: "ml.g5.2xlarge",
        min_gpu_memory_gb: 24,
        estimated_cost_per_hour: 1.21,
        tags: &["chat", "instruction", "general-purpose"],
    },
    ModelDescriptor {
        id: "llama-3-70b",
        name: "Llama 3 70B",
        provider: "Meta",
        source: ModelSource::Jumpstart,
        model_id: "meta-textgeneration-llama-3-70b",
        description: "Larger Llama 3 variant with superior reasoning and knowledge capabilities.",
        parameter_count: "70B",
        context_length: 8192,
        license: "Llama 3 Community License",
        supported_fine_tune_types: ADAPTER_FINE_TUNE_TYPES,
        recommended_instance: "ml.p4d.24xlarge",
        min_gpu_memory_gb: 140,
        estimated_cost_per_hour: 32.77,
        tags: &["chat", "instruction", "reasoning", "enterprise"],
    },
    ModelDescriptor {
        id: "mistral-7b-v02",
        name: "Mistral 7B v0.2",
        provider: "Mistral AI",
        source: ModelSource::Jumpstart,
        model_id: "huggingface-llm-mistral-7b-v0-2",
        description: "Efficient 7B model with sliding window attention for longer context.",
        parameter_count: "7B",
        context_length: 32768,
        license: "Apache 2.0",
        supported_fine_tune_types: ALL_FINE_TUNE_TYPES,
        recommended_instance: "ml.g5.2xlarge",
        min_gpu_memory_gb: 16,
        estimated_cost_per_hour: 1.21,
        tags: &["chat", "instruction", "long-context", "efficient"],
    },
    ModelDescriptor {
        id: "codellama-7b",
        name: "Code Llama 7B",
        provider: "Meta",
        source: ModelSource::Jumpstart,
        model_id: "meta-textgeneration-llama-codellama-7b",
        description: "Specialized coding model fine-tuned from Llama 2 for code generation.",
        parameter_count: "7B",
        context_length: 16384,
        license: "Llama 2 Community License",
        supported_fine_tune_types: ALL_FINE_TUNE_TYPES,
        recommended_instance: "ml.g5.2xlarge",
        min_gpu_memory_gb: 16,
        estimated_cost_per_hour: 1.21,
        tags: &["code", "programming", "technical"],
    },
    ModelDescriptor {
        id: "phi-2",
        name: "Phi-2",
        provider: "Microsoft",
        source: ModelSource::Huggingface,
        model_id: "microsoft/phi-2",
        description: "Small but powerful 2.7B model with strong reasoning capabilities.",
        parameter_count: "2.7B",
        context_length: 2048,
        license: "MIT",
        supported_fine_tune_types: ALL_FINE_TUNE_TYPES,
        recommended_instance: "ml.g5.xlarge",
        min_gpu_memory_gb: 8,
        estimated_cost_per_hour: 0.84,
        tags: &["small", "efficient", "reasoning", "educational"],
    },
    ModelDescriptor {
        id: "gemma-7b",
        name: "Gemma 7B",
        provider: "Google",
        source: ModelSource::Huggingface,
        model_id: "google/gemma-7b",
        description: "Google's 7B open model with strong instruction-following capabilities.",
        parameter_count: "7B",
        context_length: 8192,
        license: "Gemma License",
        supported_fine_tune_types: ALL_FINE_TUNE_TYPES,
        recommended_instance: "ml.g5.2xlarge",
        min_gpu_memory_gb: 16,
        estimated_cost_per_hour: 1.21,
        tags: &["instruction", "chat", "google"],
    },
];

pub fn list_models(filter: &ModelFilter) -> Vec<ModelDescriptor> {
    MODEL_CATALOG
        .iter()
        .filter(|model| filter.matches(model))
        .cloned()
        .collect()
}

pub fn find_model(model_id: &str) -> Option<ModelDescriptor> {
    MODEL_CATALOG
        .iter()
        .find(|model| model.id == model_id)
        .cloned()
}
