//! Keyword-matched help responder for the in-app assistant panel.

use serde::{Deserialize, Serialize};

use crate::endpoints::ChatMessage;

pub const GREETING: &str =
    "Hi! I'm your AI assistant for LLM Toolkit. How can I help you today?";

pub const FALLBACK_MENU: &str = "I can help you with that! Here are some topics I can explain:\n\n\
- **LoRA/QLoRA** fine-tuning techniques\n\
- **Model selection** guidance\n\
- **Learning rate** and hyperparameters\n\
- **Dataset** best practices\n\
- **Cost** estimation and optimization\n\n\
What would you like to know more about?";

const LORA_ANSWER: &str = "**LoRA (Low-Rank Adaptation)** is a parameter-efficient fine-tuning technique that:

1. **Freezes** the original model weights
2. **Adds** small trainable matrices to specific layers
3. **Reduces** memory and compute requirements by 10-100x

**LoRA Rank** controls the size of these adapter matrices:
- **Lower rank (8-16)**: Faster training, less memory, may underfit complex tasks
- **Higher rank (32-128)**: Better capacity, slower training, more memory

**Recommendation**: Start with rank 16-32 for most tasks.";

const MODEL_ANSWER: &str = "**Choosing the right base model** depends on several factors:

1. **Task complexity**: Simple tasks → smaller models (2-7B), Complex reasoning → larger models (13-70B)
2. **Context length needs**: Short inputs → any model, Long documents → Mistral (32K), Llama 3 (8K)
3. **Budget**: Limited → Phi-2, Gemma 2B; Production → Llama 3 8B, Mistral 7B
4. **License**: Commercial use → Apache 2.0 models (Mistral, Falcon)

**Recommendation**: Start with Mistral 7B or Llama 3 8B for a good balance.";

const LEARNING_RATE_ANSWER: &str = "**Learning Rate** controls how much weights change during training:

- **Too high**: Model diverges, loss explodes
- **Too low**: Training is slow, may get stuck

**Typical ranges for fine-tuning**:
- Full fine-tune: 1e-5 to 5e-5
- LoRA: 1e-4 to 3e-4
- QLoRA: 2e-4 to 5e-4

**Tips**:
1. Use warmup (10% of steps)
2. Use cosine decay
3. If loss spikes, try 2-3x lower LR";

const DATASET_ANSWER: &str = "**Best practices for fine-tuning datasets**:

1. **Quality over quantity**: 100-1000 high-quality examples often beat 10K noisy ones
2. **Format consistency**: Use consistent instruction templates
3. **Diversity**: Cover edge cases and variations
4. **Validation split**: Keep 10-20% for evaluation
5. **Token limits**: Most models have 2K-8K context limits

**Common formats**:
```json
{\"instruction\": \"...\", \"input\": \"...\", \"output\": \"...\"}
{\"messages\": [{\"role\": \"user\", \"content\": \"...\"}, ...]}
```";

const COST_ANSWER: &str = "**Understanding AWS SageMaker costs**:

1. **Instance costs**: Billed per second while running
2. **GPU instances**: ml.g5.xlarge (~$1.00/hr), ml.g5.2xlarge (~$1.21/hr)
3. **Storage**: S3 storage for datasets and model artifacts

**Cost optimization tips**:
- Use spot instances for training (up to 70% savings)
- Start with smaller models for experimentation
- Use QLoRA for memory-efficient training
- Set max training hours to prevent runaway costs";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HelpTopic {
    Lora,
    Model,
    LearningRate,
    Dataset,
    Cost,
}

impl HelpTopic {
    /// Checked in this order; the first topic with a keyword hit wins.
    const PRIORITY: [(HelpTopic, &'static [&'static str]); 5] = [
        (HelpTopic::Lora, &["lora", "rank", "qlora", "peft"]),
        (HelpTopic::Model, &["model", "choose", "select", "which"]),
        (HelpTopic::LearningRate, &["learning", "rate", "lr"]),
        (HelpTopic::Dataset, &["dataset", "data", "format", "upload"]),
        (HelpTopic::Cost, &["cost", "price", "expensive", "budget"]),
    ];

    pub fn detect(text: &str) -> Option<Self> {
        let lowered = text.to_lowercase();
        Self::PRIORITY
            .iter()
            .find(|(_, keywords)| keywords.iter().any(|keyword| lowered.contains(keyword)))
            .map(|(topic, _)| *topic)
    }

    pub const fn answer(self) -> &'static str {
        match self {
            Self::Lora => LORA_ANSWER,
            Self::Model => MODEL_ANSWER,
            Self::LearningRate => LEARNING_RATE_ANSWER,
            Self::Dataset => DATASET_ANSWER,
            Self::Cost => COST_ANSWER,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AssistantChatInput {
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
    #[serde(default)]
    pub context: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssistantReply {
    pub response: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssistantSuggestions {
    pub suggestions: Vec<&'static str>,
}

pub fn reply(messages: &[ChatMessage]) -> AssistantReply {
    let response = match messages.last() {
        None => GREETING,
        Some(last) => HelpTopic::detect(&last.content).map_or(FALLBACK_MENU, HelpTopic::answer),
    };
    AssistantReply { response }
}

pub fn suggestions(context: Option<&str>) -> AssistantSuggestions {
    let suggestions: &[&'static str] = match context {
        Some("model-selection") => &[
            "Which model is best for chat applications?",
            "What's the difference between 7B and 13B models?",
            "Should I use JumpStart or Hugging Face models?",
        ],
        Some("training-config") => &[
            "What learning rate should I use?",
            "How many epochs do I need?",
            "Should I use gradient checkpointing?",
        ],
        Some("dataset-upload") => &[
            "What format should my dataset be in?",
            "How many examples do I need?",
            "How do I handle long documents?",
        ],
        _ => &[
            "What does LoRA rank do?",
            "How do I choose the right model?",
            "Explain learning rate",
            "Best practices for datasets",
        ],
    };

    AssistantSuggestions {
        suggestions: suggestions.to_vec(),
    }
}
