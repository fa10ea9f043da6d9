//! Prompt construction for forced-choice questions.

use std::fmt;
use std::str::FromStr;

const PLAIN_INSTRUCTION: &str =
    "Only reply with a single letter: A or B. Do not say Neither, you have to reply with a single letter.";

/// Language the model is asked to reason in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReasoningLanguage {
    #[default]
    English,
    Hausa,
    Swahili,
}

impl ReasoningLanguage {
    pub fn code(&self) -> &'static str {
        match self {
            ReasoningLanguage::English => "EN",
            ReasoningLanguage::Hausa => "HA",
            ReasoningLanguage::Swahili => "SW",
        }
    }

    fn instruction(&self) -> &'static str {
        match self {
            ReasoningLanguage::English => {
                "First, provide a step-by-step reasoning in English explaining which sentence is a more logical continuation of the story. After your reasoning, on a new line, state your final answer as only a single letter: A or B."
            }
            ReasoningLanguage::Hausa => {
                "Da farko, bayar da dalili mataki-mataki a cikin harshen Hausa da ke bayanin wace jumla ce ta fi dacewa da ci gaban labarin. Bayan ka bayar da dalilinka, a kan sabon layi, bayyana amsarka ta karshe da harafi guda daya kawai: A ko B."
            }
            ReasoningLanguage::Swahili => {
                "Kwanza, toa sababu hatua kwa hatua kwa lugha ya Kiswahili ukieleza ni sentensi ipi inayoendeleza hadithi kimantiki zaidi. Baada ya maelezo yako, kwenye mstari mpya, taja jibu lako la mwisho kama herufi moja tu: A au B."
            }
        }
    }
}

impl fmt::Display for ReasoningLanguage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for ReasoningLanguage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "EN" | "ENGLISH" => Ok(ReasoningLanguage::English),
            "HA" | "HAUSA" => Ok(ReasoningLanguage::Hausa),
            "SW" | "SWAHILI" => Ok(ReasoningLanguage::Swahili),
            other => Err(format!("unknown reasoning language: {other}")),
        }
    }
}

/// How a model is asked to answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptMode {
    /// Reply with the letter only.
    Plain,
    /// Reason first, then give the letter on its own line.
    ChainOfThought(ReasoningLanguage),
}

impl PromptMode {
    pub fn is_chain_of_thought(&self) -> bool {
        matches!(self, PromptMode::ChainOfThought(_))
    }

    /// Build the prompt for one item.
    pub fn build(&self, context: &str, option_a: &str, option_b: &str) -> String {
        let instruction = match self {
            PromptMode::Plain => PLAIN_INSTRUCTION,
            PromptMode::ChainOfThought(language) => language.instruction(),
        };
        format!(
            "Given the following story context:\n\n{context}\n\n\
             Which sentence comes next?\n\n\
             A: {option_a}\n\n\
             B: {option_b}\n\n\
             {instruction}"
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_prompt() {
        let prompt = PromptMode::Plain.build("A fox ran.", "It was fast.", "The end.");
        assert_eq!(
            prompt,
            "Given the following story context:\n\nA fox ran.\n\nWhich sentence comes next?\n\n\
             A: It was fast.\n\nB: The end.\n\n\
             Only reply with a single letter: A or B. Do not say Neither, you have to reply with a single letter."
        );
    }

    #[test]
    fn test_cot_prompt_uses_language() {
        let prompt = PromptMode::ChainOfThought(ReasoningLanguage::Swahili).build("c", "a", "b");
        assert!(prompt.starts_with("Given the following story context:\n\nc\n\n"));
        assert!(prompt.ends_with("A au B."));

        let english = PromptMode::ChainOfThought(ReasoningLanguage::English).build("c", "a", "b");
        assert!(english.contains("step-by-step reasoning in English"));
    }

    #[test]
    fn test_language_parsing() {
        assert_eq!("ha".parse::<ReasoningLanguage>(), Ok(ReasoningLanguage::Hausa));
        assert_eq!(" Swahili ".parse::<ReasoningLanguage>(), Ok(ReasoningLanguage::Swahili));
        assert!("fr".parse::<ReasoningLanguage>().is_err());
        assert_eq!(ReasoningLanguage::default().to_string(), "EN");
    }
}
