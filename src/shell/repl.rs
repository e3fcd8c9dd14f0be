// Interactive question loop. Thin adapter between a terminal and the
// PolicyAssistant - no business logic lives here.

use crate::core::ai::{AiProvider, PolicyAssistant};
use crate::core::corpus::PolicyContext;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

const PROMPT: &str = "\nYour question: ";

const NO_KNOWLEDGE_MESSAGE: &str =
    "\nCould not load any policy information. Please check your Google Drive folder and files.\n";

/// `exit` in any letter case ends the session.
pub fn is_exit_command(line: &str) -> bool {
    line.trim().eq_ignore_ascii_case("exit")
}

/// Tells the operator the knowledge base could not be built. Printed once;
/// the caller ends the process normally afterwards.
pub async fn report_startup_failure<W, E>(output: &mut W, error: &E) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
    E: std::fmt::Display + ?Sized,
{
    output
        .write_all(
            format!(
                "\nERROR: {}\n\nCould not initialize the HR Assistant due to an error during Google Drive sync.\n",
                error
            )
            .as_bytes(),
        )
        .await?;
    output.flush().await
}

/// Starts a session over the loaded policies. With no policy text there is
/// nothing to answer from, so no question is ever read.
pub async fn run<R, W, P>(
    input: R,
    output: &mut W,
    assistant: &PolicyAssistant<P>,
    knowledge: &PolicyContext,
) -> std::io::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
    P: AiProvider,
{
    if knowledge.is_empty() {
        output.write_all(NO_KNOWLEDGE_MESSAGE.as_bytes()).await?;
        return output.flush().await;
    }

    run_question_loop(input, output, assistant, &knowledge.render()).await
}

/// Reads questions until `exit` or end of input, printing one answer per question.
pub async fn run_question_loop<R, W, P>(
    input: R,
    output: &mut W,
    assistant: &PolicyAssistant<P>,
    context: &str,
) -> std::io::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
    P: AiProvider,
{
    output
        .write_all(b"\nHR Assistant is ready. Type 'exit' to quit.\n")
        .await?;
    output.write_all(format!("{}\n", "-".repeat(40)).as_bytes()).await?;

    let mut lines = input.lines();
    loop {
        output.write_all(PROMPT.as_bytes()).await?;
        output.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        if is_exit_command(&line) {
            break;
        }

        let answer = assistant.ask(&line, context).await;
        output
            .write_all(format!("\nAssistant: {}\n", answer).as_bytes())
            .await?;
    }

    output.flush().await
}
