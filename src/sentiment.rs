//! Coarse document sentiment.
//!
//! Lexicon scorer in the spirit of pattern/TextBlob: every sentiment-bearing
//! word contributes a polarity in [-1, 1]. An intensifier in front of a word
//! scales it, and a negator flips it with a damping factor of -0.5. The
//! document polarity is the mean over all scored words.

use crate::model::Sentiment;

/// Polarity above which a document reads as positive
pub const POSITIVE_THRESHOLD: f64 = 0.1;
/// Polarity below which a document reads as negative
pub const NEGATIVE_THRESHOLD: f64 = -0.1;

/// Negation flips the next scored word and halves it
const NEGATION_FACTOR: f64 = -0.5;

/// Modifiers stay active across this many unscored words
const MODIFIER_REACH: usize = 2;

const LEXICON: &[(&str, f64)] = &[
    ("good", 0.7),
    ("great", 0.8),
    ("excellent", 1.0),
    ("outstanding", 0.9),
    ("amazing", 0.6),
    ("awesome", 1.0),
    ("wonderful", 1.0),
    ("fantastic", 0.4),
    ("best", 1.0),
    ("better", 0.5),
    ("nice", 0.6),
    ("happy", 0.8),
    ("glad", 0.5),
    ("pleased", 0.5),
    ("love", 0.5),
    ("loved", 0.7),
    ("like", 0.2),
    ("enjoy", 0.4),
    ("enjoyed", 0.4),
    ("positive", 0.23),
    ("success", 0.3),
    ("successful", 0.75),
    ("successfully", 0.75),
    ("benefit", 0.3),
    ("beneficial", 0.5),
    ("improve", 0.3),
    ("improved", 0.3),
    ("improvement", 0.3),
    ("growth", 0.2),
    ("profit", 0.3),
    ("profitable", 0.5),
    ("strong", 0.43),
    ("effective", 0.6),
    ("efficient", 0.5),
    ("reliable", 0.5),
    ("helpful", 0.5),
    ("useful", 0.3),
    ("clear", 0.1),
    ("easy", 0.43),
    ("perfect", 1.0),
    ("beautiful", 0.85),
    ("impressive", 1.0),
    ("brilliant", 0.9),
    ("exciting", 0.3),
    ("excited", 0.4),
    ("thank", 0.2),
    ("thanks", 0.2),
    ("grateful", 0.6),
    ("appreciate", 0.4),
    ("welcome", 0.8),
    ("win", 0.8),
    ("won", 0.8),
    ("favorable", 0.6),
    ("fortunate", 0.5),
    ("safe", 0.5),
    ("secure", 0.4),
    ("fair", 0.7),
    ("correct", 0.3),
    ("right", 0.29),
    ("fine", 0.42),
    ("satisfied", 0.5),
    ("satisfactory", 0.4),
    ("recommend", 0.3),
    ("approved", 0.3),
    ("healthy", 0.5),
    ("bad", -0.7),
    ("worse", -0.4),
    ("worst", -1.0),
    ("poor", -0.4),
    ("terrible", -1.0),
    ("awful", -1.0),
    ("horrible", -1.0),
    ("hate", -0.8),
    ("hated", -0.9),
    ("sad", -0.5),
    ("unhappy", -0.6),
    ("angry", -0.5),
    ("upset", -0.5),
    ("disappointed", -0.75),
    ("disappointing", -0.6),
    ("fail", -0.5),
    ("failed", -0.5),
    ("failure", -0.32),
    ("loss", -0.3),
    ("losses", -0.3),
    ("lose", -0.4),
    ("lost", -0.3),
    ("decline", -0.3),
    ("declined", -0.3),
    ("problem", -0.3),
    ("problems", -0.3),
    ("issue", -0.1),
    ("issues", -0.1),
    ("risk", -0.2),
    ("risky", -0.5),
    ("danger", -0.5),
    ("dangerous", -0.6),
    ("error", -0.4),
    ("errors", -0.4),
    ("wrong", -0.5),
    ("broken", -0.4),
    ("difficult", -0.5),
    ("hard", -0.29),
    ("weak", -0.38),
    ("slow", -0.3),
    ("late", -0.3),
    ("delay", -0.3),
    ("delayed", -0.3),
    ("damage", -0.5),
    ("damaged", -0.5),
    ("harm", -0.5),
    ("harmful", -0.6),
    ("pain", -0.5),
    ("painful", -0.7),
    ("sick", -0.71),
    ("ill", -0.5),
    ("dead", -0.2),
    ("death", -0.4),
    ("crisis", -0.5),
    ("concern", -0.2),
    ("concerns", -0.2),
    ("concerned", -0.3),
    ("worried", -0.4),
    ("unfortunately", -0.5),
    ("unfortunate", -0.5),
    ("negative", -0.3),
    ("complaint", -0.4),
    ("reject", -0.4),
    ("rejected", -0.4),
    ("denied", -0.3),
    ("ugly", -0.7),
    ("stupid", -0.8),
    ("useless", -0.5),
    ("inadequate", -0.5),
    ("unacceptable", -0.8),
    ("fraud", -0.7),
    ("debt", -0.2),
    ("penalty", -0.4),
];

const INTENSIFIERS: &[(&str, f64)] = &[
    ("very", 1.3),
    ("really", 1.2),
    ("extremely", 1.5),
    ("incredibly", 1.5),
    ("highly", 1.3),
    ("so", 1.2),
    ("too", 1.2),
    ("quite", 1.1),
    ("most", 1.3),
    ("absolutely", 1.5),
    ("slightly", 0.5),
    ("somewhat", 0.7),
    ("barely", 0.4),
];

const NEGATORS: &[&str] = &["not", "no", "never", "none", "nothing", "neither", "nor", "without"];

fn lookup(table: &[(&str, f64)], word: &str) -> Option<f64> {
    table.iter().find(|(w, _)| *w == word).map(|(_, v)| *v)
}

fn is_negator(word: &str) -> bool {
    NEGATORS.contains(&word) || word.ends_with("n't") || word.ends_with("nt'")
}

fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !(c.is_alphanumeric() || c == '\'' || c == '’'))
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase().replace('’', "'"))
}

/// Polarity of `text` in [-1, 1]; 0.0 when nothing scores
pub fn polarity(text: &str) -> f64 {
    let mut scores: Vec<f64> = Vec::new();
    let mut multiplier = 1.0;
    let mut negated = false;
    let mut since_modifier = 0usize;

    for word in tokenize(text) {
        if let Some(value) = lookup(LEXICON, &word) {
            let mut score = value * multiplier;
            if negated {
                score *= NEGATION_FACTOR;
            }
            scores.push(score.clamp(-1.0, 1.0));
            multiplier = 1.0;
            negated = false;
            since_modifier = 0;
        } else if let Some(factor) = lookup(INTENSIFIERS, &word) {
            multiplier *= factor;
            since_modifier = 0;
        } else if is_negator(&word) {
            negated = !negated;
            since_modifier = 0;
        } else if multiplier != 1.0 || negated {
            since_modifier += 1;
            if since_modifier > MODIFIER_REACH {
                multiplier = 1.0;
                negated = false;
                since_modifier = 0;
            }
        }
    }

    if scores.is_empty() {
        return 0.0;
    }
    let mean = scores.iter().sum::<f64>() / scores.len() as f64;
    mean.clamp(-1.0, 1.0)
}

/// Bucket a polarity into a label
pub fn classify(polarity: f64) -> Sentiment {
    if polarity > POSITIVE_THRESHOLD {
        Sentiment::Positive
    } else if polarity < NEGATIVE_THRESHOLD {
        Sentiment::Negative
    } else {
        Sentiment::Neutral
    }
}

/// Sentiment label for a document; blank text is neutral
pub fn analyze(text: &str) -> Sentiment {
    if text.trim().is_empty() {
        return Sentiment::Neutral;
    }
    classify(polarity(text))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_is_neutral() {
        assert_eq!(analyze("   \n\t"), Sentiment::Neutral);
        assert_eq!(polarity(""), 0.0);
    }

    #[test]
    fn simple_labels() {
        assert_eq!(
            analyze("The quarter was a great success and the team is happy."),
            Sentiment::Positive
        );
        assert_eq!(
            analyze("Terrible service, the order failed and arrived damaged."),
            Sentiment::Negative
        );
        assert_eq!(
            analyze("The meeting is scheduled for Tuesday at 10am in room 4."),
            Sentiment::Neutral
        );
    }

    #[test]
    fn negation_flips_and_damps() {
        let plain = polarity("good");
        let negated = polarity("not good");
        assert!(plain > 0.0);
        assert!(negated < 0.0);
        assert!((negated - plain * NEGATION_FACTOR).abs() < 1e-9);
        assert!(polarity("this isn't bad") > 0.0);
    }

    #[test]
    fn intensifier_scales_next_word() {
        assert!(polarity("very good") > polarity("good"));
        assert!(polarity("slightly good") < polarity("good"));
        assert!(polarity("extremely excellent") <= 1.0);
    }

    #[test]
    fn modifiers_expire() {
        // "not" is too far away from "good" to negate it
        assert!(polarity("not in the least way related to good") > 0.0);
    }

    #[test]
    fn thresholds_are_exclusive() {
        assert_eq!(classify(0.1), Sentiment::Neutral);
        assert_eq!(classify(-0.1), Sentiment::Neutral);
        assert_eq!(classify(0.1001), Sentiment::Positive);
        assert_eq!(classify(-0.1001), Sentiment::Negative);
    }
}
