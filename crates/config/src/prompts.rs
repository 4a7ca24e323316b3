//! Localized prompt tables
//!
//! Every canned utterance the assistant can speak lives here, bucketed by
//! purpose and language. Selection within a bucket is deterministic given
//! the conversation id and a counter, so a session never hears the same
//! proactive prompt twice in a row and replays are reproducible.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Purpose of a canned utterance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PromptKind {
    /// Session-start greeting
    Greeting,
    /// Low-confidence clarification request
    Clarification,
    /// No intent latched yet; ask the caller to rephrase
    Rephrase,
    /// Slot elicitation: station area
    AskLocation,
    /// Slot elicitation: swap history period
    AskDateRange,
    /// Caller has been silent; nudge them
    Proactive,
    /// Final line before a no-response hangup
    NoResponseFarewell,
    /// Transferring to a human agent
    Handoff,
    /// Adapter trouble; ask the caller to repeat
    Apology,
    /// Normal goodbye
    Farewell,
    /// Canned pricing summary
    Pricing,
}

type LangBuckets = HashMap<String, Vec<String>>;

/// Language-indexed prompt buckets
///
/// Missing languages fall back to English. Loadable from YAML so deployments
/// can restyle the voice without a rebuild.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptCatalog {
    #[serde(default)]
    greeting: LangBuckets,
    #[serde(default)]
    clarification: LangBuckets,
    #[serde(default)]
    rephrase: LangBuckets,
    #[serde(default)]
    ask_location: LangBuckets,
    #[serde(default)]
    ask_date_range: LangBuckets,
    #[serde(default)]
    proactive: LangBuckets,
    #[serde(default)]
    no_response_farewell: LangBuckets,
    #[serde(default)]
    handoff: LangBuckets,
    #[serde(default)]
    apology: LangBuckets,
    #[serde(default)]
    farewell: LangBuckets,
    #[serde(default)]
    pricing: LangBuckets,
}

fn bucket(entries: &[(&str, &[&str])]) -> LangBuckets {
    entries
        .iter()
        .map(|(lang, texts)| {
            (
                lang.to_string(),
                texts.iter().map(|t| t.to_string()).collect(),
            )
        })
        .collect()
}

impl Default for PromptCatalog {
    fn default() -> Self {
        Self {
            greeting: bucket(&[
                (
                    "en",
                    &[
                        "Hello! Welcome to driver support. How can I help you today?",
                        "Hi! This is driver support. What can I do for you?",
                    ],
                ),
                (
                    "hi",
                    &[
                        "नमस्ते! ड्राइवर सहायता में आपका स्वागत है। बताइए, क्या मदद चाहिए?",
                        "हैलो! ड्राइवर सहायता लाइन पर आपका स्वागत है। क्या help चाहिए?",
                    ],
                ),
            ]),
            clarification: bucket(&[
                (
                    "en",
                    &["I'm sorry, I didn't quite catch that. Could you please repeat?"],
                ),
                (
                    "hi",
                    &["माफ़ कीजिए, ठीक से समझ नहीं आया। क्या आप दोबारा बोल सकते हैं?"],
                ),
            ]),
            rephrase: bucket(&[
                (
                    "en",
                    &[
                        "What do you need? A station, your swap history, or something else?",
                        "Tell me, what are you looking for?",
                    ],
                ),
                (
                    "hi",
                    &[
                        "क्या चाहिए? Station चाहिए या कुछ और?",
                        "बताओ, क्या help चाहिए?",
                    ],
                ),
            ]),
            ask_location: bucket(&[
                ("en", &["Which area are you in?"]),
                ("hi", &["आप किस इलाके में हैं?"]),
            ]),
            ask_date_range: bucket(&[
                ("en", &["Which date or period?"]),
                ("hi", &["किस दिन का देखना है?"]),
            ]),
            proactive: bucket(&[
                (
                    "en",
                    &[
                        "Hello? I'm listening, go ahead?",
                        "Are you there?",
                        "What do you need?",
                        "I'm here, what's up?",
                    ],
                ),
                (
                    "hi",
                    &[
                        "हैलो? सुन रहा हूं, बोलो?",
                        "क्या वहाँ हो?",
                        "बताओ, क्या चाहिए?",
                        "यहाँ हूं, बोलो क्या help चाहिए?",
                    ],
                ),
            ]),
            no_response_farewell: bucket(&[
                (
                    "en",
                    &["If you need help, speak up. Otherwise, I'll end the call."],
                ),
                (
                    "hi",
                    &["अगर help चाहिए तो बोलो, वरना call बंद कर रहा हूं"],
                ),
            ]),
            handoff: bucket(&[
                (
                    "en",
                    &[
                        "Okay, connecting you to an agent, hold on.",
                        "Let me connect you to someone who can help, one moment.",
                        "Transferring you to an agent, stay on the line.",
                    ],
                ),
                (
                    "hi",
                    &[
                        "ठीक है, मैं आपको agent से connect कर रहा हूं, wait करो।",
                        "चलो, agent से बात करवाता हूं, थोड़ा wait करो।",
                        "Agent से connect कर रहा हूं, line पर रहो।",
                    ],
                ),
            ]),
            apology: bucket(&[
                (
                    "en",
                    &["Sorry, I'm having trouble on my end. Could you say that again?"],
                ),
                (
                    "hi",
                    &["माफ़ कीजिए, कुछ गड़बड़ हो गई। दोबारा बोलेंगे?"],
                ),
            ]),
            farewell: bucket(&[
                ("en", &["Thanks for calling. Drive safe!"]),
                ("hi", &["कॉल करने के लिए धन्यवाद। सुरक्षित चलाइए!"]),
            ]),
            pricing: bucket(&[
                (
                    "en",
                    &["A battery swap costs a flat 150 rupees, and monthly plans start at 999 rupees."],
                ),
                (
                    "hi",
                    &["एक battery swap का charge 150 रुपये है, और monthly plan 999 रुपये से शुरू होते हैं।"],
                ),
            ]),
        }
    }
}

static BUILTIN: Lazy<PromptCatalog> = Lazy::new(PromptCatalog::default);

impl PromptCatalog {
    pub fn builtin() -> Self {
        BUILTIN.clone()
    }

    /// Load a catalog from YAML, keeping builtin texts for omitted buckets
    pub fn from_yaml(yaml: &str) -> Result<Self, crate::ConfigError> {
        let loaded: PromptCatalog =
            serde_yaml::from_str(yaml).map_err(|e| crate::ConfigError::ParseError(e.to_string()))?;
        Ok(loaded.merged_over(Self::default()))
    }

    fn merged_over(self, base: Self) -> Self {
        fn merge(over: LangBuckets, base: LangBuckets) -> LangBuckets {
            let mut merged = base;
            for (lang, texts) in over {
                if !texts.is_empty() {
                    merged.insert(lang, texts);
                }
            }
            merged
        }
        Self {
            greeting: merge(self.greeting, base.greeting),
            clarification: merge(self.clarification, base.clarification),
            rephrase: merge(self.rephrase, base.rephrase),
            ask_location: merge(self.ask_location, base.ask_location),
            ask_date_range: merge(self.ask_date_range, base.ask_date_range),
            proactive: merge(self.proactive, base.proactive),
            no_response_farewell: merge(self.no_response_farewell, base.no_response_farewell),
            handoff: merge(self.handoff, base.handoff),
            apology: merge(self.apology, base.apology),
            farewell: merge(self.farewell, base.farewell),
            pricing: merge(self.pricing, base.pricing),
        }
    }

    fn buckets(&self, kind: PromptKind) -> &LangBuckets {
        match kind {
            PromptKind::Greeting => &self.greeting,
            PromptKind::Clarification => &self.clarification,
            PromptKind::Rephrase => &self.rephrase,
            PromptKind::AskLocation => &self.ask_location,
            PromptKind::AskDateRange => &self.ask_date_range,
            PromptKind::Proactive => &self.proactive,
            PromptKind::NoResponseFarewell => &self.no_response_farewell,
            PromptKind::Handoff => &self.handoff,
            PromptKind::Apology => &self.apology,
            PromptKind::Farewell => &self.farewell,
            PromptKind::Pricing => &self.pricing,
        }
    }

    /// Pick a prompt deterministically
    ///
    /// The conversation id anchors the rotation and the counter advances it,
    /// so consecutive counters walk distinct entries of the bucket.
    pub fn pick(&self, kind: PromptKind, lang: &str, conversation_id: &str, counter: u32) -> String {
        let buckets = self.buckets(kind);
        let texts = buckets
            .get(lang)
            .filter(|t| !t.is_empty())
            .or_else(|| buckets.get("en"))
            .expect("builtin catalog always carries an English bucket");

        let index = (stable_hash(conversation_id) as usize + counter as usize) % texts.len();
        texts[index].clone()
    }
}

/// FNV-1a, stable across runs and builds
fn stable_hash(s: &str) -> u64 {
    const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;
    let mut hash = OFFSET;
    for byte in s.as_bytes() {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(PRIME);
    }
    hash
}
