use std::io::{self, Write};

use crossterm::style::{Color, Stylize};
use research_core::{AppViewModel, DownloadState, JobBadge, JobView, Stage, StageColor, StageMarker};

/// Prints view-model changes as they happen. The terminal is append-only, so
/// the renderer remembers what it already printed and writes only the
/// difference.
pub struct TerminalRenderer<W: Write> {
    out: W,
    color: bool,
    line_end: &'static str,
    shown: Shown,
}

#[derive(Default)]
struct Shown {
    job_id: Option<String>,
    start_pending: bool,
    start_error: Option<String>,
    transcript_len: usize,
    stage: Option<Stage>,
    badge: Option<JobBadge>,
    auto_refresh: Option<bool>,
    fetch_error: Option<String>,
    download_url: Option<String>,
    download: DownloadState,
}

impl<W: Write> TerminalRenderer<W> {
    pub fn new(out: W, color: bool) -> Self {
        Self {
            out,
            color,
            line_end: "\n",
            shown: Shown::default(),
        }
    }

    /// Raw mode does not translate `\n`, so lines end in `\r\n`.
    pub fn with_raw_mode(mut self) -> Self {
        self.line_end = "\r\n";
        self
    }

    fn line(&mut self, text: &str) -> io::Result<()> {
        write!(self.out, "{text}{}", self.line_end)
    }

    pub fn render(&mut self, view: &AppViewModel) -> io::Result<()> {
        if view.start_pending && !self.shown.start_pending {
            self.line(&format!("Starting research on: {}", view.topic.trim()))?;
        }
        self.shown.start_pending = view.start_pending;

        if view.error != self.shown.start_error {
            if let Some(error) = &view.error {
                self.line(&self.paint("Error", StageColor::Accent, error))?;
            }
            self.shown.start_error = view.error.clone();
        }

        if let Some(job) = &view.job {
            self.render_job(job)?;
        }

        self.out.flush()
    }

    fn render_job(&mut self, job: &JobView) -> io::Result<()> {
        if self.shown.job_id.as_deref() != Some(job.job_id.as_str()) {
            self.shown = Shown {
                job_id: Some(job.job_id.clone()),
                start_pending: self.shown.start_pending,
                start_error: self.shown.start_error.clone(),
                ..Shown::default()
            };
            self.line(&format!("Job {}", job.job_id))?;
        }

        for line in job.transcript.iter().skip(self.shown.transcript_len) {
            self.line(&format!("  > {line}"))?;
        }
        self.shown.transcript_len = job.transcript.len();

        if self.shown.stage != Some(job.stage) {
            self.line(&self.stage_line(job))?;
            self.shown.stage = Some(job.stage);
        }

        if self.shown.auto_refresh.is_some_and(|on| on != job.auto_refresh) {
            let state = if job.auto_refresh { "on" } else { "off" };
            self.line(&format!("Auto-refresh {state}"))?;
        }
        self.shown.auto_refresh = Some(job.auto_refresh);

        if job.error != self.shown.fetch_error {
            if let Some(error) = &job.error {
                self.line(&self.paint("Error", StageColor::Accent, error))?;
            }
            self.shown.fetch_error = job.error.clone();
        }

        if job.badge != self.shown.badge {
            if let Some(badge) = job.badge {
                self.line(&self.badge_line(badge))?;
            }
            self.shown.badge = job.badge;
        }

        if job.download_url != self.shown.download_url {
            if let Some(url) = &job.download_url {
                self.line(&self.paint("Download", StageColor::Green, url))?;
            }
            self.shown.download_url = job.download_url.clone();
        }

        if job.download != self.shown.download {
            match &job.download {
                DownloadState::NotRequested => {}
                DownloadState::InProgress => self.line("Downloading...")?,
                DownloadState::Saved(path) => self.line(&format!("Saved to {}", path.display()))?,
                DownloadState::Failed(error) => self.line(&format!("Download failed: {error}"))?,
            }
            self.shown.download = job.download.clone();
        }

        Ok(())
    }

    fn stage_line(&self, job: &JobView) -> String {
        let bar: String = job
            .stages
            .iter()
            .map(|row| match row.marker {
                StageMarker::Done => '#',
                StageMarker::Current => '>',
                StageMarker::Pending => '.',
            })
            .collect();
        let label = format!("[{}/{}]", job.stage.index() + 1, Stage::ALL.len());
        let text = format!("[{bar}] {}", job.stage.name());
        self.paint(&label, job.stage.color(), &text)
    }

    fn paint(&self, label: &str, color: StageColor, text: &str) -> String {
        self.styled(label, stage_color(color), text)
    }

    fn badge_line(&self, badge: JobBadge) -> String {
        let color = match badge {
            JobBadge::Running => Color::Blue,
            JobBadge::Complete => Color::Green,
            JobBadge::Error => Color::Red,
        };
        self.styled("Status:", color, badge_label(badge))
    }

    fn styled(&self, label: &str, color: Color, text: &str) -> String {
        if self.color {
            format!("{} {text}", label.with(color).bold())
        } else {
            format!("{label} {text}")
        }
    }

    #[cfg(test)]
    fn into_inner(self) -> W {
        self.out
    }
}

fn badge_label(badge: JobBadge) -> &'static str {
    match badge {
        JobBadge::Running => "Running",
        JobBadge::Complete => "Complete",
        JobBadge::Error => "Error",
    }
}

fn stage_color(color: StageColor) -> Color {
    match color {
        StageColor::Primary => Color::Blue,
        StageColor::Secondary => Color::Magenta,
        StageColor::Accent => Color::Yellow,
        StageColor::Green => Color::Green,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use research_core::StageRowView;
    use std::path::PathBuf;

    fn job(transcript: &[&str], stage: Stage) -> JobView {
        JobView {
            job_id: "42".to_string(),
            transcript: transcript.iter().map(|s| s.to_string()).collect(),
            stage,
            stages: Stage::ALL
                .iter()
                .map(|&s| StageRowView {
                    stage: s,
                    marker: match s.cmp(&stage) {
                        std::cmp::Ordering::Less => StageMarker::Done,
                        std::cmp::Ordering::Equal => StageMarker::Current,
                        std::cmp::Ordering::Greater => StageMarker::Pending,
                    },
                })
                .collect(),
            badge: Some(JobBadge::Running),
            output_file: None,
            download_url: None,
            auto_refresh: true,
            polling: true,
            refreshing: false,
            error: None,
            download: DownloadState::NotRequested,
            finished: false,
        }
    }

    fn view(job: JobView) -> AppViewModel {
        AppViewModel {
            job: Some(job),
            ..AppViewModel::default()
        }
    }

    fn output(renderer: TerminalRenderer<Vec<u8>>) -> String {
        String::from_utf8(renderer.into_inner()).unwrap()
    }

    #[test]
    fn prints_only_new_transcript_lines() {
        let mut renderer = TerminalRenderer::new(Vec::new(), false);
        renderer
            .render(&view(job(&["Initializing research"], Stage::Initializing)))
            .unwrap();
        renderer
            .render(&view(job(
                &["Initializing research", "Gathering literature from arXiv..."],
                Stage::GatheringLiterature,
            )))
            .unwrap();

        assert_eq!(
            output(renderer),
            "Job 42\n\
             \x20 > Initializing research\n\
             [1/9] [>........] Initializing\n\
             Status: Running\n\
             \x20 > Gathering literature from arXiv...\n\
             [3/9] [##>......] Gathering literature\n"
        );
    }

    #[test]
    fn terminal_job_shows_link_badge_and_saved_file() {
        let mut renderer = TerminalRenderer::new(Vec::new(), false);
        let mut done = job(&["Complete"], Stage::Complete);
        done.badge = Some(JobBadge::Complete);
        done.output_file = Some("paper.pdf".to_string());
        done.download_url = Some("http://127.0.0.1:5000/api/download/paper.pdf".to_string());
        done.download = DownloadState::Saved(PathBuf::from("out/paper.pdf"));
        renderer.render(&view(done)).unwrap();

        let text = output(renderer);
        assert!(text.contains("[9/9] [########>] Complete\n"));
        assert!(text.contains("Status: Complete\n"));
        assert!(text.contains("Download http://127.0.0.1:5000/api/download/paper.pdf\n"));
        assert!(text.contains("Saved to out/paper.pdf\n"));
    }

    #[test]
    fn repeated_fetch_error_is_printed_once() {
        let mut renderer = TerminalRenderer::new(Vec::new(), false);
        let mut failing = job(&[], Stage::Initializing);
        failing.error = Some("Failed to get job status".to_string());
        renderer.render(&view(failing.clone())).unwrap();
        renderer.render(&view(failing)).unwrap();

        let text = output(renderer);
        assert_eq!(text.matches("Error Failed to get job status").count(), 1);
    }

    #[test]
    fn start_error_and_toggle_are_reported() {
        let mut renderer = TerminalRenderer::new(Vec::new(), false);
        renderer
            .render(&AppViewModel {
                error: Some("Topic is required".to_string()),
                ..AppViewModel::default()
            })
            .unwrap();
        let mut running = job(&[], Stage::Initializing);
        renderer.render(&view(running.clone())).unwrap();
        running.auto_refresh = false;
        renderer.render(&view(running)).unwrap();

        let text = output(renderer);
        assert!(text.starts_with("Error Topic is required\n"));
        assert!(text.ends_with("Auto-refresh off\n"));
    }

    #[test]
    fn color_styles_only_the_label() {
        let plain = TerminalRenderer::new(Vec::new(), false);
        assert_eq!(plain.paint("Download", StageColor::Green, "x"), "Download x");

        let colored = TerminalRenderer::new(Vec::new(), true);
        let text = colored.paint("Download", StageColor::Green, "x");
        assert!(text.starts_with("\x1b["));
        assert!(text.contains("Download"));
        assert!(text.ends_with(" x"));
        assert_ne!(text, "Download x");
    }

    #[test]
    fn raw_mode_lines_end_with_carriage_return() {
        let mut renderer = TerminalRenderer::new(Vec::new(), false).with_raw_mode();
        renderer
            .render(&view(job(&["Initializing research"], Stage::Initializing)))
            .unwrap();

        let text = output(renderer);
        assert!(text.starts_with("Job 42\r\n  > Initializing research\r\n"));
        assert_eq!(text.matches('\n').count(), text.matches("\r\n").count());
    }
}
