//! `medgate ask` - dispatch one prompt from the terminal

use medgate_llm::{AttemptOutcome, AttemptRecord, CallOutcome, Capability, DispatchRequest, Message};

/// Arguments of the `ask` command
#[derive(Debug)]
pub struct AskArgs {
    pub prompt: String,
    pub vision_image: Option<String>,
    pub model: Option<String>,
    pub system: Option<String>,
    pub verbose: bool,
}

impl AskArgs {
    fn into_request(self) -> DispatchRequest {
        let request = match self.vision_image {
            Some(image) => DispatchRequest::new(vec![Message::user_with_image(self.prompt, image)])
                .with_capability(Capability::Vision),
            None => DispatchRequest::new(vec![Message::user(self.prompt)]),
        };
        let request = match self.model {
            Some(model) => request.with_preferred_model(model),
            None => request,
        };
        match self.system {
            Some(system) => request.with_system_prompt(system),
            None => request,
        }
    }
}

pub async fn run(args: AskArgs) -> anyhow::Result<()> {
    let router = super::load_router()?;
    let verbose = args.verbose;
    let outcome = router.dispatch(args.into_request()).await;

    if verbose {
        let attempts = match &outcome {
            CallOutcome::Success(c) => &c.attempts,
            CallOutcome::Failure(f) => &f.tried,
        };
        for attempt in attempts {
            eprintln!("{}", describe_attempt(attempt));
        }
    }

    match &outcome {
        CallOutcome::Success(completion) => {
            if let Some(reasoning) = &completion.reasoning {
                println!("💭 {}\n", reasoning);
            }
            println!("{}", completion.text);
            eprintln!(
                "\nvia {} / {}{}",
                completion.provider,
                completion.model,
                completion
                    .tokens_used
                    .map(|t| format!(", {t} tokens"))
                    .unwrap_or_default()
            );
            Ok(())
        }
        CallOutcome::Failure(failure) => {
            println!("{}", failure.message);
            if let Some(err) = &failure.last_error {
                eprintln!("last error: {}", err);
            }
            std::process::exit(2);
        }
    }
}

fn describe_attempt(attempt: &AttemptRecord) -> String {
    let result = match &attempt.outcome {
        AttemptOutcome::Skipped { reason } => format!("skipped ({})", reason.as_str()),
        AttemptOutcome::Failed { class, error } => format!("failed [{}] {}", class.as_str(), error),
        AttemptOutcome::Succeeded { tokens } => format!("ok, {tokens} tokens"),
    };
    format!("  {}/{}: {}", attempt.provider, attempt.model, result)
}
