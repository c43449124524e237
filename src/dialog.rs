use async_trait::async_trait;
use gateway::OneTimeSecret;
use tokio::{
    io::{
        AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader, Lines, Stdin, Stdout,
    },
    sync::Mutex,
};

/// How a dialog was closed. `Cancelled` covers every way a user can back out
/// and is never reported as an error.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DialogOutcome<T> {
    Confirmed(T),
    Cancelled,
    Failed(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Confirmation {
    pub header: String,
    pub body: String,
    /// Label of the button that confirms, i.e "Delete client".
    pub action: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SecretReveal {
    pub client_id: String,
    pub secret: OneTimeSecret,
    pub title: String,
    pub message: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InputRequest {
    pub header: String,
    pub label: String,
    pub min_length: usize,
}

#[mockall::automock]
#[async_trait]
pub trait DialogManager: Send + Sync {
    async fn confirm(&self, request: Confirmation) -> DialogOutcome<()>;
    async fn reveal_secret(&self, reveal: SecretReveal) -> DialogOutcome<()>;
    async fn input(&self, request: InputRequest) -> DialogOutcome<String>;
}

/// Prompts on a terminal. End of input counts as the user walking away.
pub struct TerminalDialogs<R, W> {
    input: Mutex<Lines<R>>,
    output: Mutex<W>,
}

impl TerminalDialogs<BufReader<Stdin>, Stdout> {
    pub fn stdio() -> Self {
        Self::new(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
    }
}

impl<R, W> TerminalDialogs<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    pub fn new(reader: R, writer: W) -> Self {
        Self {
            input: Mutex::new(reader.lines()),
            output: Mutex::new(writer),
        }
    }

    async fn ask(&self, prompt: &str) -> std::io::Result<Option<String>> {
        {
            let mut output = self.output.lock().await;
            output.write_all(prompt.as_bytes()).await?;
            output.flush().await?;
        }
        self.input.lock().await.next_line().await
    }

    #[cfg(test)]
    fn into_output(self) -> W {
        self.output.into_inner()
    }
}

#[async_trait]
impl<R, W> DialogManager for TerminalDialogs<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    async fn confirm(&self, request: Confirmation) -> DialogOutcome<()> {
        let prompt = format!(
            "\n{}\n{}\n{}? [y/N] ",
            request.header, request.body, request.action
        );
        match self.ask(&prompt).await {
            Ok(Some(answer)) if matches!(answer.trim().to_lowercase().as_str(), "y" | "yes") => {
                DialogOutcome::Confirmed(())
            }
            Ok(_) => DialogOutcome::Cancelled,
            Err(err) => DialogOutcome::Failed(err.to_string()),
        }
    }

    async fn reveal_secret(&self, reveal: SecretReveal) -> DialogOutcome<()> {
        let prompt = format!(
            "\n{}\n{}\n  client id:     {}\n  client secret: {}\nPress enter to confirm. ",
            reveal.title,
            reveal.message,
            reveal.client_id,
            reveal.secret.expose()
        );
        match self.ask(&prompt).await {
            Ok(Some(_)) => DialogOutcome::Confirmed(()),
            Ok(None) => DialogOutcome::Cancelled,
            Err(err) => DialogOutcome::Failed(err.to_string()),
        }
    }

    async fn input(&self, request: InputRequest) -> DialogOutcome<String> {
        let prompt = format!("\n{}\n{}: ", request.header, request.label);
        match self.ask(&prompt).await {
            Ok(Some(value)) => {
                let value = value.trim().to_owned();
                if value.is_empty() {
                    DialogOutcome::Cancelled
                } else if value.chars().count() < request.min_length {
                    DialogOutcome::Failed(format!(
                        "{} must be at least {} characters long",
                        request.label, request.min_length
                    ))
                } else {
                    DialogOutcome::Confirmed(value)
                }
            }
            Ok(None) => DialogOutcome::Cancelled,
            Err(err) => DialogOutcome::Failed(err.to_string()),
        }
    }
}

/// For scripted runs: every confirmation is accepted and secrets are printed.
/// Anything that needs typed input fails.
#[derive(Clone, Copy, Debug, Default)]
pub struct AssumeYes;

#[async_trait]
impl DialogManager for AssumeYes {
    async fn confirm(&self, request: Confirmation) -> DialogOutcome<()> {
        tracing::debug!(header = %request.header, "confirmed without prompting");
        DialogOutcome::Confirmed(())
    }

    async fn reveal_secret(&self, reveal: SecretReveal) -> DialogOutcome<()> {
        println!("{}", reveal.title);
        println!("client_id: {}", reveal.client_id);
        println!("client_secret: {}", reveal.secret.expose());
        DialogOutcome::Confirmed(())
    }

    async fn input(&self, request: InputRequest) -> DialogOutcome<String> {
        DialogOutcome::Failed(format!(
            "{} cannot be asked for when running non-interactively",
            request.label
        ))
    }
}
