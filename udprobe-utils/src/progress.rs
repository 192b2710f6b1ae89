use indicatif::{ProgressBar, ProgressStyle};

/// Progress bar over the languages of an experiment.
pub fn language_progress(n_languages: usize, task: &str) -> ProgressBar {
    let progress = ProgressBar::new(n_languages as u64);
    progress.set_style(ProgressStyle::default_bar().template(&format!(
        "[Time: {{elapsed_precise}}, ETA: {{eta_precise}}] {{bar}} {{pos}}/{{len}} {} {{msg}}",
        task
    )));

    progress
}
