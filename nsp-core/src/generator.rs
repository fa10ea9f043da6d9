//! Next-sentence-prediction item generation.
//!
//! For every context length in the configured range, a window slides over a
//! story's sentences. Each window yields one forced-choice item pairing the true
//! next sentence with a distractor drawn from later in the same story.
//!
//! Random draws happen in a fixed order per item: first the distractor index,
//! then the A/B slot. Seeding the generator's RNG once therefore reproduces a
//! dataset exactly.

use crate::text::{normalize, split_sentences, split_stories, word_count};
use rand::Rng;
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Invalid generator configuration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{name} range is empty: min {min} > max {max}")]
    EmptyRange {
        name: &'static str,
        min: usize,
        max: usize,
    },

    #[error("{0} must be at least 1")]
    Zero(&'static str),
}

/// Window and distractor bounds, all inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeneratorConfig {
    pub min_context_len: usize,
    pub max_context_len: usize,
    pub min_distractor_dist: usize,
    pub max_distractor_dist: usize,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            min_context_len: 3,
            max_context_len: 10,
            min_distractor_dist: 2,
            max_distractor_dist: 10,
        }
    }
}

impl GeneratorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_context_range(mut self, min: usize, max: usize) -> Self {
        self.min_context_len = min;
        self.max_context_len = max;
        self
    }

    pub fn with_distractor_range(mut self, min: usize, max: usize) -> Self {
        self.min_distractor_dist = min;
        self.max_distractor_dist = max;
        self
    }

    /// Check the ranges are non-empty and that a distractor can never be the
    /// true continuation itself.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_context_len == 0 {
            return Err(ConfigError::Zero("min_context_len"));
        }
        if self.min_distractor_dist == 0 {
            return Err(ConfigError::Zero("min_distractor_dist"));
        }
        if self.min_context_len > self.max_context_len {
            return Err(ConfigError::EmptyRange {
                name: "context length",
                min: self.min_context_len,
                max: self.max_context_len,
            });
        }
        if self.min_distractor_dist > self.max_distractor_dist {
            return Err(ConfigError::EmptyRange {
                name: "distractor distance",
                min: self.min_distractor_dist,
                max: self.max_distractor_dist,
            });
        }
        Ok(())
    }

    /// Fewest sentences a story needs to produce at least one item.
    pub fn min_story_len(&self) -> usize {
        self.min_context_len
            .saturating_add(self.min_distractor_dist)
            .saturating_add(1)
    }
}

/// Which option slot holds the true continuation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Label {
    A,
    B,
}

impl Label {
    pub fn as_str(&self) -> &'static str {
        match self {
            Label::A => "A",
            Label::B => "B",
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One forced-choice item. Field order is the dataset column order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NspItem {
    pub story_id: usize,
    pub story_length: usize,
    pub context: String,
    pub context_length: usize,
    pub distractor_distance: usize,
    pub distractor_length: usize,
    #[serde(rename = "option_A")]
    pub option_a: String,
    #[serde(rename = "option_B")]
    pub option_b: String,
    pub label: Label,
}

impl NspItem {
    pub fn true_continuation(&self) -> &str {
        match self.label {
            Label::A => &self.option_a,
            Label::B => &self.option_b,
        }
    }

    pub fn distractor(&self) -> &str {
        match self.label {
            Label::A => &self.option_b,
            Label::B => &self.option_a,
        }
    }
}

/// A story after sentence splitting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Story {
    /// Position in extraction order, counting stories that are later skipped.
    pub story_id: usize,
    pub sentences: Vec<String>,
}

impl Story {
    pub fn story_length(&self) -> usize {
        self.sentences.len()
    }
}

/// Split a corpus into sentence-split stories.
pub fn load_stories(corpus: &str) -> Vec<Story> {
    split_stories(corpus)
        .iter()
        .enumerate()
        .map(|(story_id, text)| Story {
            story_id,
            sentences: split_sentences(text),
        })
        .collect()
}

/// Generate every item for one story.
///
/// Callers are expected to skip stories shorter than
/// [`GeneratorConfig::min_story_len`]; shorter input simply yields nothing.
/// Items come out ordered by context length, then window start.
pub fn generate_items<R: Rng>(
    sentences: &[String],
    story_id: usize,
    story_length: usize,
    config: &GeneratorConfig,
    rng: &mut R,
) -> Vec<NspItem> {
    let n = sentences.len();
    let mut items = Vec::new();

    for context_len in config.min_context_len..=config.max_context_len {
        let starts = n.saturating_sub(context_len.saturating_add(config.min_distractor_dist));
        // Longer contexts only leave fewer starts.
        if starts == 0 {
            break;
        }

        for i in 0..starts {
            let next = i + context_len;
            let lo = next + config.min_distractor_dist;
            let hi = next.saturating_add(config.max_distractor_dist).min(n - 1);
            if lo > hi {
                continue;
            }

            let d_idx = rng.gen_range(lo..=hi);
            let raw_distractor = &sentences[d_idx];

            let context = normalize(&sentences[i..next].join(" "));
            let truth = normalize(&sentences[next]);
            let distractor = normalize(raw_distractor);

            let (option_a, option_b, label) = if rng.gen_bool(0.5) {
                (truth, distractor, Label::A)
            } else {
                (distractor, truth, Label::B)
            };

            items.push(NspItem {
                story_id,
                story_length,
                context,
                context_length: context_len,
                distractor_distance: d_idx - next,
                distractor_length: word_count(raw_distractor),
                option_a,
                option_b,
                label,
            });
        }
    }

    items
}

/// Counts from one dataset build.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildStats {
    pub stories: usize,
    pub skipped: usize,
    pub items: usize,
}

/// Run the whole pipeline over a corpus: split, skip short stories, generate.
pub fn build_dataset<R: Rng>(
    corpus: &str,
    config: &GeneratorConfig,
    rng: &mut R,
) -> Result<(Vec<NspItem>, BuildStats), ConfigError> {
    config.validate()?;

    let stories = load_stories(corpus);
    let mut stats = BuildStats {
        stories: stories.len(),
        ..BuildStats::default()
    };
    let mut items = Vec::new();

    for story in &stories {
        let story_length = story.story_length();
        if story_length < config.min_story_len() {
            tracing::warn!(
                story_id = story.story_id,
                story_length,
                "skipping story too short for a single item"
            );
            stats.skipped += 1;
            continue;
        }

        let generated = generate_items(&story.sentences, story.story_id, story_length, config, rng);
        tracing::debug!(story_id = story.story_id, items = generated.len(), "generated items");
        items.extend(generated);
    }

    stats.items = items.len();
    tracing::info!(
        stories = stats.stories,
        skipped = stats.skipped,
        items = stats.items,
        "dataset built"
    );

    Ok((items, stats))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn sentences(texts: &[&str]) -> Vec<String> {
        texts.iter().map(|s| s.to_string()).collect()
    }

    fn numbered(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("Sentence number {i} here.")).collect()
    }

    #[test]
    fn test_single_valid_item() {
        let story = sentences(&[
            "Once upon a time.",
            "A fox ran.",
            "It was fast.",
            "The sun set.",
            "The end.",
        ]);
        let config = GeneratorConfig::new()
            .with_context_range(3, 3)
            .with_distractor_range(1, 1);
        let mut rng = StdRng::seed_from_u64(7);

        let items = generate_items(&story, 0, story.len(), &config, &mut rng);
        assert_eq!(items.len(), 1);

        let item = &items[0];
        assert_eq!(item.context, "Once upon a time. A fox ran. It was fast.");
        assert_eq!(item.true_continuation(), "The sun set.");
        assert_eq!(item.distractor(), "The end.");
        assert_eq!(item.distractor_distance, 1);
        assert_eq!(item.distractor_length, 2);
        assert_eq!(item.context_length, 3);
        assert_eq!(item.story_length, 5);
    }

    #[test]
    fn test_items_respect_bounds_and_labels() {
        let story = numbered(30);
        let config = GeneratorConfig::default();
        let mut rng = StdRng::seed_from_u64(42);

        let items = generate_items(&story, 3, story.len(), &config, &mut rng);
        assert!(!items.is_empty());

        for item in &items {
            assert!((3..=10).contains(&item.context_length));
            assert!((2..=10).contains(&item.distractor_distance));

            // Recover the window start from the context text.
            let start = story
                .iter()
                .position(|s| item.context.starts_with(s.as_str()))
                .unwrap();
            let next = start + item.context_length;
            let truth = &story[next];
            let distractor = &story[next + item.distractor_distance];

            let mut options = [item.option_a.as_str(), item.option_b.as_str()];
            options.sort();
            let mut expected = [truth.as_str(), distractor.as_str()];
            expected.sort();
            assert_eq!(options, expected);
            assert_eq!(item.true_continuation(), truth);
        }
    }

    #[test]
    fn test_item_ordering_and_count() {
        let n = 20;
        let story = numbered(n);
        let config = GeneratorConfig::default();
        let mut rng = StdRng::seed_from_u64(1);

        let items = generate_items(&story, 0, n, &config, &mut rng);

        let expected: usize = (3..=10).map(|c: usize| n.saturating_sub(c + 2)).sum();
        assert_eq!(items.len(), expected);

        let keys: Vec<(usize, &str)> = items
            .iter()
            .map(|it| (it.context_length, it.context.as_str()))
            .collect();
        let mut context_lengths: Vec<usize> = keys.iter().map(|k| k.0).collect();
        let sorted = {
            let mut s = context_lengths.clone();
            s.sort();
            s
        };
        assert_eq!(context_lengths, sorted);
        context_lengths.dedup();
        assert_eq!(context_lengths, (3..=10).collect::<Vec<_>>());

        // Within one context length the window advances one sentence at a time.
        let first_len = items.iter().filter(|it| it.context_length == 3);
        for (i, item) in first_len.enumerate() {
            assert!(item.context.starts_with(&story[i]));
        }
    }

    #[test]
    fn test_distractor_clamped_to_story_end() {
        let story = numbered(8);
        let config = GeneratorConfig::new()
            .with_context_range(3, 3)
            .with_distractor_range(2, 10);
        let mut rng = StdRng::seed_from_u64(9);

        let items = generate_items(&story, 0, 8, &config, &mut rng);
        // Starts 0..3; the last window (start 2) has exactly one candidate.
        assert_eq!(items.len(), 3);
        let last = &items[2];
        assert_eq!(last.distractor_distance, 2);
        assert_eq!(last.distractor(), story[7]);
    }

    #[test]
    fn test_short_story_yields_nothing() {
        let config = GeneratorConfig::default();
        let story = numbered(config.min_story_len() - 1);
        let mut rng = StdRng::seed_from_u64(0);
        assert!(generate_items(&story, 0, story.len(), &config, &mut rng).is_empty());
        assert!(generate_items(&[], 0, 0, &config, &mut rng).is_empty());
    }

    #[test]
    fn test_minimum_story_yields_one_item() {
        let config = GeneratorConfig::default();
        let story = numbered(config.min_story_len());
        let mut rng = StdRng::seed_from_u64(0);
        let items = generate_items(&story, 0, story.len(), &config, &mut rng);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].distractor_distance, 2);
    }

    #[test]
    fn test_same_seed_same_items() {
        let story = numbered(25);
        let config = GeneratorConfig::default();

        let a = generate_items(&story, 0, 25, &config, &mut StdRng::seed_from_u64(123));
        let b = generate_items(&story, 0, 25, &config, &mut StdRng::seed_from_u64(123));
        assert_eq!(a, b);
    }

    #[test]
    fn test_unbounded_distractor_range_is_capped_by_story() {
        let story = numbered(12);
        let wide = GeneratorConfig::new().with_distractor_range(2, usize::MAX);

        let items = generate_items(&story, 0, 12, &wide, &mut StdRng::seed_from_u64(9));
        let expected = generate_items(&story, 0, 12, &GeneratorConfig::default(), &mut StdRng::seed_from_u64(9));
        assert!(!items.is_empty());
        assert_eq!(items, expected);
    }

    #[test]
    fn test_unbounded_context_range_stops_at_story_end() {
        let story = numbered(12);
        let wide = GeneratorConfig::new().with_context_range(3, usize::MAX);

        let items = generate_items(&story, 0, 12, &wide, &mut StdRng::seed_from_u64(9));
        let expected = generate_items(&story, 0, 12, &GeneratorConfig::default(), &mut StdRng::seed_from_u64(9));
        assert_eq!(items, expected);
        assert_eq!(items.iter().map(|it| it.context_length).max(), Some(9));
    }

    #[test]
    fn test_build_with_extreme_bounds() {
        let corpus = numbered(12).join(" ");
        let config = GeneratorConfig::new()
            .with_context_range(3, usize::MAX)
            .with_distractor_range(2, usize::MAX);
        let (items, stats) = build_dataset(&corpus, &config, &mut StdRng::seed_from_u64(1)).unwrap();
        assert_eq!((stats.stories, stats.skipped), (1, 0));
        assert_eq!(stats.items, items.len());

        let huge = GeneratorConfig::new().with_context_range(usize::MAX, usize::MAX);
        let (items, stats) = build_dataset(&corpus, &huge, &mut StdRng::seed_from_u64(1)).unwrap();
        assert!(items.is_empty());
        assert_eq!(stats.skipped, 1);
    }

    #[test]
    fn test_both_labels_occur() {
        let story = numbered(40);
        let config = GeneratorConfig::default();
        let mut rng = StdRng::seed_from_u64(5);
        let items = generate_items(&story, 0, 40, &config, &mut rng);
        assert!(items.iter().any(|it| it.label == Label::A));
        assert!(items.iter().any(|it| it.label == Label::B));
    }

    #[test]
    fn test_text_fields_are_normalized() {
        let story = sentences(&[
            "One\nline.",
            "Two   spaced.",
            "Three.",
            "Four\r\nhere.",
            "Five.",
            "Six  six six.",
        ]);
        let config = GeneratorConfig::new()
            .with_context_range(3, 3)
            .with_distractor_range(2, 2);
        let mut rng = StdRng::seed_from_u64(3);

        let items = generate_items(&story, 0, 6, &config, &mut rng);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].context, "One line. Two spaced. Three.");
        assert_eq!(items[0].true_continuation(), "Four here.");
        assert_eq!(items[0].distractor(), "Six six six.");
        assert_eq!(items[0].distractor_length, 3);
    }

    #[test]
    fn test_config_validation() {
        assert!(GeneratorConfig::default().validate().is_ok());
        assert_eq!(
            GeneratorConfig::new().with_context_range(5, 4).validate(),
            Err(ConfigError::EmptyRange {
                name: "context length",
                min: 5,
                max: 4
            })
        );
        assert_eq!(
            GeneratorConfig::new().with_distractor_range(0, 4).validate(),
            Err(ConfigError::Zero("min_distractor_dist"))
        );
        assert_eq!(
            GeneratorConfig::new().with_context_range(0, 4).validate(),
            Err(ConfigError::Zero("min_context_len"))
        );
    }

    #[test]
    fn test_build_dataset_skips_short_stories() {
        let long: Vec<String> = numbered(7);
        let corpus = format!(
            "Too short. Only two.\n---\n{}\n---\n\n---\n{}",
            long.join(" "),
            numbered(3).join(" ")
        );
        let config = GeneratorConfig::new().with_context_range(3, 4);
        let mut rng = StdRng::seed_from_u64(11);

        let (items, stats) = build_dataset(&corpus, &config, &mut rng).unwrap();
        assert_eq!(stats.stories, 3);
        assert_eq!(stats.skipped, 2);
        assert_eq!(stats.items, items.len());
        // 7 sentences: context 3 -> 2 windows, context 4 -> 1 window.
        assert_eq!(items.len(), 3);
        assert!(items.iter().all(|it| it.story_id == 1 && it.story_length == 7));
    }

    #[test]
    fn test_build_dataset_rejects_bad_config() {
        let config = GeneratorConfig::new().with_distractor_range(4, 2);
        let mut rng = StdRng::seed_from_u64(0);
        assert!(build_dataset("A. B. C.", &config, &mut rng).is_err());
    }

    #[test]
    fn test_empty_corpus() {
        let mut rng = StdRng::seed_from_u64(0);
        let (items, stats) = build_dataset("", &GeneratorConfig::default(), &mut rng).unwrap();
        assert!(items.is_empty());
        assert_eq!(stats, BuildStats::default());
    }
}
