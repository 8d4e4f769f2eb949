/* Command sequencer: an operation is an explicit ordered list of steps, each one exchange (send a */
/* frame, then await the acknowledgement). Execution is strictly sequential and stops at the     */
/* first failed transfer; the device has no rollback, so nothing is retried or resumed.          */
use std::borrow::Cow;
use std::fmt;

use tracing::{debug, warn};

use crate::error::Result;
use crate::frame::{FOOTER, Frame, HEADER};
use crate::transport::Transport;

/* Role of a step within an operation, for logs and assertions. */
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepKind {
    Header,
    Payload,
    Footer,
    /* Standalone status query outside any transaction. */
    Probe,
    /* Standalone frame that makes staged profile data live. */
    Commit,
}

impl fmt::Display for StepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            StepKind::Header => "header",
            StepKind::Payload => "payload",
            StepKind::Footer => "footer",
            StepKind::Probe => "probe",
            StepKind::Commit => "commit",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub kind: StepKind,
    pub frame: Cow<'static, Frame>,
}

/* Ordered steps making up one logical device operation. */
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Script {
    name: &'static str,
    steps: Vec<Step>,
}

impl Script {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            steps: Vec::new(),
        }
    }

    /* Append a header-delimited transaction around `payloads`. */
    pub fn transaction<I>(mut self, payloads: I) -> Self
    where
        I: IntoIterator<Item = Cow<'static, Frame>>,
    {
        self.push(StepKind::Header, Cow::Borrowed(&HEADER));
        for frame in payloads {
            self.push(StepKind::Payload, frame);
        }
        self.push(StepKind::Footer, Cow::Borrowed(&FOOTER));
        self
    }

    /* Append a step that is not wrapped in a header/footer pair. */
    pub fn standalone(mut self, kind: StepKind, frame: Cow<'static, Frame>) -> Self {
        self.push(kind, frame);
        self
    }

    fn push(&mut self, kind: StepKind, frame: Cow<'static, Frame>) {
        self.steps.push(Step { kind, frame });
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

/* One round trip: send `frame`, then read the acknowledgement. */
pub async fn exchange<T>(transport: &mut T, frame: &Frame) -> Result<Vec<u8>>
where
    T: Transport + ?Sized,
{
    transport.send_command(frame).await?;
    transport.receive_reply().await
}

/* Run every step of `script` in order and collect the replies. */
pub async fn execute<T>(transport: &mut T, script: &Script) -> Result<Vec<Vec<u8>>>
where
    T: Transport + ?Sized,
{
    debug!("Running {} ({} exchanges)", script.name, script.len());

    let mut replies = Vec::with_capacity(script.len());
    for (index, step) in script.steps.iter().enumerate() {
        match exchange(&mut *transport, &step.frame).await {
            Ok(reply) => replies.push(reply),
            Err(e) => {
                warn!(
                    "{}: step {index} ({}) failed, {} step(s) not sent: {e}",
                    script.name,
                    step.kind,
                    script.len() - index - 1
                );
                return Err(e);
            }
        }
    }

    Ok(replies)
}
