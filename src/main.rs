use anyhow::Result;
use chrono::Utc;
use clap::Parser;
use palaver::{
    ApiClient, AppConfig, ApprovalAction, ApprovalRequest, ClientConfig, Conversation,
    StreamEvent, StreamTarget, TurnRequest,
    cli::{ChatOptions, Cli, Commands, ConfigAction, SessionsAction},
    console::{console, init_console},
    drive_turn,
    protocol::opaque_text,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load config to get configured verbosity level
    let config = AppConfig::load().unwrap_or_default();

    // Initialize console with effective verbosity (CLI takes precedence over config)
    let effective_verbosity = cli.get_effective_verbosity(config.get_verbosity());
    init_console(effective_verbosity);

    match cli.command {
        Some(Commands::Chat(options)) => handle_chat(options, &config).await?,
        Some(Commands::Sessions { action }) => handle_sessions(action, &config).await?,
        Some(Commands::Config { action }) => handle_config(action)?,
        None => handle_chat(ChatOptions::default(), &config).await?,
    }

    Ok(())
}

fn create_client(config: &AppConfig) -> Result<ApiClient> {
    Ok(ApiClient::new(ClientConfig {
        base_url: config.base_url.clone(),
        api_token: config.api_token.clone(),
    })?)
}

async fn handle_chat(options: ChatOptions, config: &AppConfig) -> Result<()> {
    let client = create_client(config)?;

    let target = if let Some(agent) = options.agent.clone() {
        StreamTarget::Agent(agent)
    } else if let Some(workflow) = options.workflow.clone() {
        StreamTarget::Workflow(workflow)
    } else {
        StreamTarget::Chat
    };

    let mut conversation = Conversation::new(target.default_profile());
    if let Some(session_id) = &options.session {
        let session = client.get_session(session_id).await?;
        conversation = conversation.with_session_id(session.session_id);
    }

    console().welcome(client.base_url());

    if let Some(message) = options.message.clone() {
        run_turn(&client, &target, &mut conversation, message, &options, config).await?;
        resolve_pending_approvals(&client, &mut conversation).await?;
        return Ok(());
    }

    let stdin = BufReader::new(tokio::io::stdin());
    let mut lines = stdin.lines();
    loop {
        console().token("> ");
        let Some(line) = lines.next_line().await? else {
            break;
        };
        let message = line.trim();
        if message.is_empty() {
            continue;
        }
        if message == "/quit" || message == "/exit" {
            break;
        }

        run_turn(
            &client,
            &target,
            &mut conversation,
            message.to_string(),
            &options,
            config,
        )
        .await?;
        resolve_pending_approvals(&client, &mut conversation).await?;
    }

    console().goodbye();
    Ok(())
}

async fn run_turn(
    client: &ApiClient,
    target: &StreamTarget,
    conversation: &mut Conversation,
    message: String,
    options: &ChatOptions,
    config: &AppConfig,
) -> Result<()> {
    // Submit gating lives here, not in the state machine.
    if conversation.is_streaming() {
        console().warning("A turn is already streaming for this session.");
        return Ok(());
    }

    let mut request = TurnRequest::new(message.clone());
    if let Some(session_id) = conversation.session_id() {
        request = request.with_session_id(session_id.to_string());
    }
    if let Some(provider) = options.provider.clone().or_else(|| config.provider.clone()) {
        request = request.with_provider(provider);
    }
    if let Some(model) = options.model.clone().or_else(|| config.model.clone()) {
        request = request.with_model(model);
    }
    if let Some(temperature) = options.temperature.or(config.temperature) {
        request = request.with_temperature(temperature);
    }

    conversation.begin_turn(message, None);

    let cancel = CancellationToken::new();
    let mut handle = client.stream_turn(target, &request, cancel.clone());

    {
        let drive = drive_turn(conversation, &mut handle, print_event);
        tokio::pin!(drive);
        loop {
            tokio::select! {
                _ = &mut drive => break,
                result = tokio::signal::ctrl_c() => {
                    if result.is_ok() {
                        console().warning("Cancelling turn...");
                    }
                    cancel.cancel();
                }
            }
        }
    }
    console().newline();

    let dropped = handle.diagnostics.total_dropped();
    if dropped > 0 {
        console().debug(&format!("{} stream frames dropped by the decoder", dropped));
    }

    if let Some(error) = conversation.last_error() {
        console().error(error);
    }

    Ok(())
}

fn print_event(event: &StreamEvent) {
    let console = console();
    match event {
        StreamEvent::Token(token) => console.token(&token.content),
        StreamEvent::ToolCall(call) => {
            console.tool_call(
                &call.tool_name,
                call.arguments_text().as_deref().unwrap_or(""),
            );
        }
        StreamEvent::ToolResult(result) => {
            if let Some(text) = result.result_text() {
                console.tool_result_summary(&text);
            }
        }
        StreamEvent::AgentStart(agent) => console.agent_started(&agent.agent_name),
        StreamEvent::ApprovalRequest(request) => {
            console.approval_request(
                &request.tool_name,
                &request.message,
                request.countdown(Utc::now()).as_deref(),
            );
        }
        _ => {}
    }
}

async fn resolve_pending_approvals(
    client: &ApiClient,
    conversation: &mut Conversation,
) -> Result<()> {
    if conversation.approvals().is_empty() {
        return Ok(());
    }

    let stdin = BufReader::new(tokio::io::stdin());
    let mut lines = stdin.lines();

    let pending: Vec<ApprovalRequest> = conversation.approvals().iter().cloned().collect();
    for request in pending {
        let console = console();
        console.newline();
        console.approval_request(
            &request.tool_name,
            &request.message,
            request.countdown(Utc::now()).as_deref(),
        );
        if request.config.show_args && !request.tool_args.is_empty() {
            for (key, value) in &request.tool_args {
                console.plain(&format!("  {} = {}", key, opaque_text(value)));
            }
        }
        console.plain("[a]pprove / [r]eject / [c]ancel / anything else leaves it pending");

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let action = match line.trim() {
            "a" | "approve" => ApprovalAction::Approve,
            "r" | "reject" => ApprovalAction::Reject,
            "c" | "cancel" => ApprovalAction::Cancel,
            _ => {
                console.info("Left pending.");
                continue;
            }
        };

        let reason = if action == ApprovalAction::Reject {
            console.plain("Reason?");
            lines
                .next_line()
                .await?
                .map(|line| line.trim().to_string())
                .filter(|line| !line.is_empty())
        } else {
            None
        };

        match conversation
            .resolve_approval(client, &request.approval_id, action, reason.as_deref())
            .await
        {
            Ok(()) => console.success(&format!("{}: {}", action.as_str(), request.tool_name)),
            Err(error) => console.error(&error.to_string()),
        }
    }

    Ok(())
}

async fn handle_sessions(action: SessionsAction, config: &AppConfig) -> Result<()> {
    let client = create_client(config)?;

    match action {
        SessionsAction::List => {
            let sessions = client.list_sessions().await?;
            if sessions.is_empty() {
                console().info("No sessions.");
            }
            for session in sessions {
                match session.title {
                    Some(title) => console().plain(&format!("{}  {}", session.session_id, title)),
                    None => console().plain(&session.session_id),
                }
            }
        }
        SessionsAction::Delete { session_id } => {
            client.delete_session(&session_id).await?;
            console().success(&format!("Deleted session {}", session_id));
        }
    }

    Ok(())
}

fn handle_config(action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Show => {
            let config = AppConfig::load()?;
            console().plain(&toml::to_string_pretty(&config)?);
        }
        ConfigAction::Set { key, value } => {
            let mut config = AppConfig::load()?;
            config.set_value(&key, value)?;
            config.save()?;
            console().success(&format!("Set {}", key));
        }
    }

    Ok(())
}
