use async_trait::async_trait;
use hirebot_engine::credentials::CredentialPrompt;
use hirebot_engine::notify::Notifier;
use hirebot_engine::posting::JobPosting;
use hirebot_engine::settings::CredentialField;
use std::io::Write;

/// Asks for missing login details on the terminal.
pub struct StdinPrompt;

#[async_trait]
impl CredentialPrompt for StdinPrompt {
    async fn ask(&self, field: CredentialField) -> Option<String> {
        eprint!("Login {}: ", field);
        let _ = std::io::stderr().flush();

        tokio::task::spawn_blocking(|| {
            let mut line = String::new();
            match std::io::stdin().read_line(&mut line) {
                Ok(0) | Err(_) => None,
                Ok(_) => Some(line),
            }
        })
        .await
        .ok()
        .flatten()
    }
}

/// Rings the terminal bell, for headless runs where nobody hears the page.
pub struct TerminalBell;

#[async_trait]
impl Notifier for TerminalBell {
    async fn notify(&self, posting: &JobPosting) {
        let mut stderr = std::io::stderr();
        let _ = write!(stderr, "\x07");
        let _ = writeln!(
            stderr,
            "Job {} in {}: {}",
            posting.job_id, posting.city, posting.title
        );
    }
}
