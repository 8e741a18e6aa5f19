use std::fmt;
use std::time::Duration;
use thiserror::Error;

use crate::tally::{EnrollmentTally, EvaluationTally};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Training,
    Recognition,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Training => f.write_str("training"),
            Phase::Recognition => f.write_str("recognition"),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReportError {
    #[error("{phase} phase scanned no images, cannot average faces per image")]
    NoImages { phase: Phase },
    #[error("{phase} phase found no faces, cannot compute percentages")]
    NoFaces { phase: Phase },
}

#[derive(Debug, Clone, PartialEq)]
pub struct PhaseSummary {
    pub images: usize,
    pub faces: usize,
    pub faces_per_image: f64,
}

impl PhaseSummary {
    fn new(phase: Phase, images: usize, faces: usize) -> Result<Self, ReportError> {
        if images == 0 {
            return Err(ReportError::NoImages { phase });
        }
        Ok(Self {
            images,
            faces,
            faces_per_image: faces as f64 / images as f64,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Accuracy {
    pub correct: usize,
    pub incorrect: usize,
    pub unknown: usize,
    pub correct_pct: f64,
    pub incorrect_pct: f64,
    pub unknown_pct: f64,
}

impl Accuracy {
    fn new(tally: &EvaluationTally) -> Result<Self, ReportError> {
        if tally.faces == 0 {
            return Err(ReportError::NoFaces {
                phase: Phase::Recognition,
            });
        }
        let pct = |n: usize| 100.0 * n as f64 / tally.faces as f64;
        Ok(Self {
            correct: tally.correct,
            incorrect: tally.incorrect,
            unknown: tally.unknown,
            correct_pct: pct(tally.correct),
            incorrect_pct: pct(tally.incorrect),
            unknown_pct: pct(tally.unknown),
        })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Timings {
    pub training: Duration,
    pub recognition: Duration,
}

/// Final numbers for one run.
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub training: PhaseSummary,
    pub recognition: PhaseSummary,
    pub accuracy: Accuracy,
    pub timings: Timings,
}

impl Report {
    pub fn new(
        enrolled: &EnrollmentTally,
        evaluated: &EvaluationTally,
        timings: Timings,
    ) -> Result<Self, ReportError> {
        Ok(Self {
            training: PhaseSummary::new(Phase::Training, enrolled.images, enrolled.faces)?,
            recognition: PhaseSummary::new(Phase::Recognition, evaluated.images, evaluated.faces)?,
            accuracy: Accuracy::new(evaluated)?,
            timings,
        })
    }
}

impl fmt::Display for PhaseSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Number of total images scanned -> {}", self.images)?;
        writeln!(f, "Number of faces found -> {}", self.faces)?;
        writeln!(f, "Average number of faces per image -> {:.2}", self.faces_per_image)
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let total = self.timings.training + self.timings.recognition;
        let a = &self.accuracy;

        writeln!(f, "Total duration is {:.2} seconds", total.as_secs_f64())?;
        writeln!(f)?;
        writeln!(f, "Test results in training phase:")?;
        write!(f, "{}", self.training)?;
        writeln!(f)?;
        writeln!(f, "Test results in recognition phase:")?;
        write!(f, "{}", self.recognition)?;
        writeln!(f, "Correctly labeled -> {}", a.correct)?;
        writeln!(
            f,
            "Correctly labeled in percent against faces found -> {:.2}%",
            a.correct_pct
        )?;
        writeln!(f, "Incorrectly labeled (not counting unknowns) -> {}", a.incorrect)?;
        writeln!(
            f,
            "Incorrectly labeled in percent against faces found -> {:.2}%",
            a.incorrect_pct
        )?;
        writeln!(f, "Labeled as unknowns -> {}", a.unknown)?;
        writeln!(
            f,
            "Labeled as unknowns in percent against faces found -> {:.2}%",
            a.unknown_pct
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn evaluated() -> EvaluationTally {
        EvaluationTally {
            images: 3,
            faces: 4,
            correct: 2,
            incorrect: 1,
            unknown: 1,
        }
    }

    #[test]
    fn computes_averages_and_percentages() {
        let enrolled = EnrollmentTally { images: 3, faces: 2 };
        let report = Report::new(&enrolled, &evaluated(), Timings::default()).unwrap();

        assert!((report.training.faces_per_image - 2.0 / 3.0).abs() < 1e-9);
        assert!((report.recognition.faces_per_image - 4.0 / 3.0).abs() < 1e-9);
        assert_eq!(report.accuracy.correct_pct, 50.0);
        assert_eq!(report.accuracy.incorrect_pct, 25.0);
        assert_eq!(report.accuracy.unknown_pct, 25.0);
    }

    #[test]
    fn zero_images_is_an_error() {
        let enrolled = EnrollmentTally::default();
        assert_eq!(
            Report::new(&enrolled, &evaluated(), Timings::default()),
            Err(ReportError::NoImages {
                phase: Phase::Training
            })
        );

        let enrolled = EnrollmentTally { images: 1, faces: 1 };
        let none = EvaluationTally::default();
        assert_eq!(
            Report::new(&enrolled, &none, Timings::default()),
            Err(ReportError::NoImages {
                phase: Phase::Recognition
            })
        );
    }

    #[test]
    fn zero_faces_is_an_error() {
        let enrolled = EnrollmentTally { images: 1, faces: 1 };
        let faceless = EvaluationTally {
            images: 2,
            ..EvaluationTally::default()
        };
        let err = Report::new(&enrolled, &faceless, Timings::default()).unwrap_err();
        assert_eq!(
            err,
            ReportError::NoFaces {
                phase: Phase::Recognition
            }
        );
        assert_eq!(
            err.to_string(),
            "recognition phase found no faces, cannot compute percentages"
        );
    }

    #[test]
    fn renders_two_decimals() {
        let enrolled = EnrollmentTally { images: 3, faces: 2 };
        let timings = Timings {
            training: Duration::from_millis(1500),
            recognition: Duration::from_millis(250),
        };
        let text = Report::new(&enrolled, &evaluated(), timings)
            .unwrap()
            .to_string();

        assert!(text.contains("Total duration is 1.75 seconds"));
        assert!(text.contains("Average number of faces per image -> 0.67"));
        assert!(text.contains("Average number of faces per image -> 1.33"));
        assert!(text.contains("Correctly labeled in percent against faces found -> 50.00%"));
        assert!(text.contains("Labeled as unknowns -> 1"));
    }
}
