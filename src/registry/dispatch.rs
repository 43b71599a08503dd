//! Bounded parallel work dispatch.
//!
//! Every input gets exactly one result slot at its own index. A failing
//! input leaves its slot empty; the batch itself never fails because of one
//! input.

use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use std::fmt::Display;
use std::sync::Mutex;

use crate::error::{FuncregError, Result};

/// Completion counter shared by all workers, optionally mirrored to a
/// terminal progress bar.
#[derive(Default)]
pub struct Progress {
    completed: Mutex<usize>,
    bar: Option<ProgressBar>,
}

impl Progress {
    /// A counter with no visible output.
    pub fn hidden() -> Self {
        Self::default()
    }

    /// A counter drawn as a progress bar on stderr.
    pub fn with_bar(total: usize, message: &str) -> Self {
        let bar = ProgressBar::new(total as u64);
        if let Ok(style) =
            ProgressStyle::default_bar().template("{msg} [{wide_bar:.cyan/blue}] {pos}/{len}")
        {
            bar.set_style(style.progress_chars("#>-"));
        }
        bar.set_message(message.to_string());
        Self {
            completed: Mutex::new(0),
            bar: Some(bar),
        }
    }

    /// Record one finished input.
    pub fn tick(&self) {
        // A poisoned counter only means another worker panicked mid-update.
        let mut completed = self.completed.lock().unwrap_or_else(|e| e.into_inner());
        *completed += 1;
        if let Some(bar) = &self.bar {
            bar.set_position(*completed as u64);
        }
    }

    pub fn completed(&self) -> usize {
        *self.completed.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Remove the bar from the terminal.
    pub fn finish(&self) {
        if let Some(bar) = &self.bar {
            bar.finish_and_clear();
        }
    }
}

/// Run `work` over `inputs` with at most `jobs` concurrent invocations.
///
/// `results[i]` always belongs to `inputs[i]`, whatever order workers finish
/// in. Errors are logged with the input's label and leave `None` behind.
pub fn dispatch<I, R, E, F>(
    inputs: &[I],
    jobs: usize,
    progress: &Progress,
    work: F,
) -> Result<Vec<Option<R>>>
where
    I: Sync + Display,
    R: Send,
    E: Display,
    F: Fn(&I) -> std::result::Result<R, E> + Sync,
{
    if jobs == 0 {
        return Err(FuncregError::InvalidConfig(
            "jobs must be at least 1".to_string(),
        ));
    }

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(jobs)
        .build()
        .map_err(|e| FuncregError::InvalidConfig(format!("building worker pool: {}", e)))?;

    let results = pool.install(|| {
        inputs
            .par_iter()
            .map(|input| {
                let result = match work(input) {
                    Ok(r) => Some(r),
                    Err(e) => {
                        tracing::warn!(input = %input, error = %e, "skipping input");
                        None
                    }
                };
                progress.tick();
                result
            })
            .collect()
    });

    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_results_are_position_stable() {
        let inputs: Vec<usize> = (0..17).collect();
        for jobs in 1..=inputs.len() {
            let progress = Progress::hidden();
            let results = dispatch(&inputs, jobs, &progress, |n| {
                // later inputs finish first
                thread::sleep(Duration::from_micros((20 - *n as u64) * 50));
                Ok::<_, String>(n * 10)
            })
            .unwrap();

            assert_eq!(results.len(), inputs.len());
            for (i, slot) in results.iter().enumerate() {
                assert_eq!(*slot, Some(i * 10));
            }
            assert_eq!(progress.completed(), inputs.len());
        }
    }

    #[test]
    fn test_errors_leave_empty_slots() {
        let inputs = vec![1, 2, 3, 4];
        let progress = Progress::hidden();
        let results = dispatch(&inputs, 2, &progress, |n| {
            if n % 2 == 0 {
                Err(format!("even input {}", n))
            } else {
                Ok(*n)
            }
        })
        .unwrap();
        assert_eq!(results, vec![Some(1), None, Some(3), None]);
        assert_eq!(progress.completed(), 4);
    }

    #[test]
    fn test_concurrency_ceiling() {
        let inputs: Vec<usize> = (0..12).collect();
        let active = AtomicUsize::new(0);
        let peak = AtomicUsize::new(0);

        dispatch(&inputs, 3, &Progress::hidden(), |_| {
            let now = active.fetch_add(1, Ordering::SeqCst) + 1;
            peak.fetch_max(now, Ordering::SeqCst);
            thread::sleep(Duration::from_millis(5));
            active.fetch_sub(1, Ordering::SeqCst);
            Ok::<_, String>(())
        })
        .unwrap();

        assert!(peak.load(Ordering::SeqCst) <= 3);
    }

    #[test]
    fn test_zero_jobs_rejected() {
        let result = dispatch(&[1], 0, &Progress::hidden(), |n| Ok::<_, String>(*n));
        assert!(matches!(result, Err(FuncregError::InvalidConfig(_))));
    }
}
