use log::trace;

use crate::error::{AugmentError, SceneError, Stage};

/// Runs `attempt` until it succeeds, at most `max_attempts` times.
///
/// Each failure is logged at trace level and retried; the closure is expected
/// to draw fresh randomness on every call. After the last failed attempt the
/// error is escalated as [`SceneError::RetriesExhausted`].
pub fn retry<T, F>(stage: Stage, max_attempts: usize, mut attempt: F) -> Result<T, SceneError>
where
    F: FnMut() -> Result<T, AugmentError>,
{
    let mut last = AugmentError::NoContent;
    for n in 1..=max_attempts {
        match attempt() {
            Ok(value) => return Ok(value),
            Err(err) => {
                trace!("{stage} attempt {n}/{max_attempts} failed: {err}");
                last = err;
            }
        }
    }
    Err(SceneError::RetriesExhausted {
        stage,
        attempts: max_attempts,
        source: last,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn returns_first_success() {
        let mut calls = 0;
        let value = retry(Stage::Distractor, 10, || {
            calls += 1;
            if calls < 4 {
                Err(AugmentError::Singular)
            } else {
                Ok(calls)
            }
        })
        .unwrap();
        assert_eq!(value, 4);
        assert_eq!(calls, 4);
    }

    #[test]
    fn escalates_after_cap() {
        let mut calls = 0;
        let res: Result<(), _> = retry(Stage::Target, 3, || {
            calls += 1;
            Err(AugmentError::Degenerate {
                width: 0,
                height: 2,
            })
        });
        assert_eq!(calls, 3);
        match res {
            Err(SceneError::RetriesExhausted {
                stage,
                attempts,
                source,
            }) => {
                assert_eq!(stage, Stage::Target);
                assert_eq!(attempts, 3);
                assert_eq!(
                    source,
                    AugmentError::Degenerate {
                        width: 0,
                        height: 2
                    }
                );
            }
            other => panic!("unexpected result {other:?}"),
        }
    }
}
