use crate::matcher::{Prediction, UNKNOWN};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EnrollmentTally {
    pub images: usize,
    pub faces: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Correct,
    Incorrect,
    Unknown,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EvaluationTally {
    pub images: usize,
    pub faces: usize,
    pub correct: usize,
    pub incorrect: usize,
    pub unknown: usize,
}

impl EvaluationTally {
    /// Count one evaluated face. The predicted label is compared with the
    /// ground truth before the "Unknown" sentinel, so a person enrolled as
    /// "Unknown" is scored like any other label.
    pub fn record(&mut self, truth: &str, prediction: Prediction<'_>) -> Outcome {
        self.faces += 1;
        let predicted = prediction.label();
        let outcome = if predicted == truth {
            Outcome::Correct
        } else if predicted == UNKNOWN {
            Outcome::Unknown
        } else {
            Outcome::Incorrect
        };
        match outcome {
            Outcome::Correct => self.correct += 1,
            Outcome::Incorrect => self.incorrect += 1,
            Outcome::Unknown => self.unknown += 1,
        }
        outcome
    }

    pub fn is_consistent(&self) -> bool {
        self.correct + self.incorrect + self.unknown == self.faces
    }
}
