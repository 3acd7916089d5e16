use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use ownergate::{
    config::DEFAULT_PLUGIN_NAME,
    host::{OwnershipLookup, Offline},
    http::{Credentials, GerritClient},
    menu::owners_menu,
    session::run_session,
    surface::{JsonLines, TerminalAlert, TerminalSurface},
    Account, AppConfig, Completion, ExtensionController, GateConfig, OwnershipStatus, RevisionRef,
    StatusResolver, Variant,
};

/// Ownergate CLI
///
/// 模块 / 文件 owner 提交闸门
#[derive(Parser)]
#[command(name = "ownergate")]
#[command(author, version = env!("APP_VERSION"), about)]
#[command(
    long_about = "Resolves whether the current user owns the code touched by a patch set,\n\
                  labels the change accordingly and blocks submit for non-owners."
)]
struct Cli {
    /// 配置文件路径（默认：<config_dir>/ownergate/config.yaml）
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Gerrit 地址，覆盖配置文件
    #[arg(long, global = true)]
    server: Option<String>,

    /// 插件名，覆盖配置文件
    #[arg(long, global = true)]
    plugin: Option<String>,

    /// 闸门变体：module-owner | file-owner
    #[arg(long, global = true)]
    variant: Option<Variant>,

    /// 输出调试日志
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 查询一个 patch set 的所有权并显示标签
    Check {
        #[arg(long)]
        change: u64,

        #[arg(long)]
        revision: u64,

        /// 同时模拟一次提交，被拦截时退出码为 1
        #[arg(long)]
        submit: bool,

        /// 以匿名用户身份运行
        #[arg(long)]
        anonymous: bool,
    },

    /// 从 stdin 读取宿主事件（JSON 行），向 stdout 输出 DOM 操作和提交决策
    Session {
        /// 以匿名用户身份运行
        #[arg(long)]
        anonymous: bool,
    },

    /// 列出内置的闸门变体
    Variants,

    /// 显示当前用户的顶部菜单项
    Menu {
        /// 以匿名用户身份运行
        #[arg(long)]
        anonymous: bool,
    },
}

// ═══════════════════════════════════════════════════════════════════
// 配置
// ═══════════════════════════════════════════════════════════════════

struct Settings {
    app: AppConfig,
    gate: GateConfig,
}

fn load_settings(cli: &Cli) -> Result<Settings> {
    let path = cli.config.clone().or_else(AppConfig::default_path);
    let mut app = AppConfig::load_or_default(path.as_deref())?;

    if let Some(server) = &cli.server {
        app.server = Some(server.clone());
    }
    if let Some(plugin) = &cli.plugin {
        app.plugin_name = plugin.clone();
    }

    // 命令行指定变体时忽略文件里的覆盖
    let gate = match cli.variant {
        Some(variant) => {
            app.variant = variant;
            variant.gate_config()
        }
        None => app.effective_gate(),
    };
    gate.validate().context("Invalid gate config")?;

    Ok(Settings { app, gate })
}

fn build_client(app: &AppConfig) -> Result<Option<GerritClient>> {
    let Some(server) = app.server.as_deref() else {
        return Ok(None);
    };

    let credentials = match (&app.username, &app.password) {
        (Some(username), Some(password)) => Some(Credentials {
            username: username.clone(),
            password: password.clone(),
        }),
        _ => None,
    };

    let client = GerritClient::new(server, credentials, Duration::from_secs(app.timeout_secs))
        .with_context(|| format!("Failed to create client for {}", server))?;
    Ok(Some(client))
}

async fn resolve_account(client: Option<&GerritClient>, anonymous: bool) -> Result<Account> {
    match client {
        Some(c) if !anonymous => c
            .current_account()
            .await
            .context("Failed to query current account"),
        _ => Ok(Account::Anonymous),
    }
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug,hyper=warn,h2=warn,reqwest=warn,rustls=warn")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

// ═══════════════════════════════════════════════════════════════════
// check
// ═══════════════════════════════════════════════════════════════════

async fn check(
    settings: Settings,
    revision: RevisionRef,
    submit: bool,
    anonymous: bool,
) -> Result<()> {
    let Some(client) = build_client(&settings.app)? else {
        bail!("No server configured - pass --server or set `server` in the config file");
    };

    let account = resolve_account(Some(&client), anonymous).await?;

    println!(
        "{}",
        format!("🔍 Ownergate: {} check for {}", settings.app.variant, revision)
            .cyan()
            .bold()
    );
    match account {
        Account::Identified(id) => println!("   👤 Account: {}", id.to_string().yellow()),
        Account::Anonymous => println!("   👤 Account: {}", "anonymous".yellow()),
    }

    let resolver = StatusResolver::new(client, settings.app.plugin_name.clone());
    let mut controller = ExtensionController::new(
        settings.gate,
        Box::new(account),
        Box::new(TerminalSurface::new()),
        Box::new(TerminalAlert),
    );

    match controller.show_revision(&resolver, revision).await {
        None => println!("   ⚠️  No user logged in, ownership not checked"),
        Some(Completion::Failed) => {
            println!("{}", "   ⚠️  Ownership lookup failed (see log)".yellow())
        }
        Some(_) => {}
    }

    let status = controller.state().current_status;
    let status_text = match status {
        OwnershipStatus::Approved => status.as_str().green(),
        OwnershipStatus::Denied => status.as_str().red(),
        OwnershipStatus::Unknown => status.as_str().yellow(),
    };
    println!("   📋 Status: {}", status_text);

    if submit {
        if controller.submit_attempted(revision) {
            println!("   {}", "✅ Submit allowed".green());
        } else {
            println!("   {}", "❌ Submit blocked".red());
            std::process::exit(1);
        }
    }

    Ok(())
}

// ═══════════════════════════════════════════════════════════════════
// session
// ═══════════════════════════════════════════════════════════════════

async fn session(settings: Settings, anonymous: bool) -> Result<()> {
    let client = build_client(&settings.app)?;
    let account = resolve_account(client.as_ref(), anonymous).await?;
    let plugin_name = settings.app.plugin_name.clone();

    // 没有服务器时账号必然是匿名，Offline 只用来满足类型
    match client {
        Some(c) => session_with(settings.gate, account, StatusResolver::new(c, plugin_name)).await,
        None => {
            session_with(settings.gate, account, StatusResolver::new(Offline, plugin_name)).await
        }
    }
}

async fn session_with<L: OwnershipLookup + 'static>(
    gate: GateConfig,
    account: Account,
    resolver: StatusResolver<L>,
) -> Result<()> {
    let sink = JsonLines::new(std::io::stdout());
    let mut controller = ExtensionController::new(
        gate,
        Box::new(account),
        Box::new(sink.clone()),
        Box::new(sink.clone()),
    );

    let input = tokio::io::BufReader::new(tokio::io::stdin());
    run_session(&mut controller, Arc::new(resolver), input, &sink).await
}

// ═══════════════════════════════════════════════════════════════════
// variants / menu
// ═══════════════════════════════════════════════════════════════════

fn list_variants() -> Result<()> {
    println!("{}", "📦 Gate variants:".cyan().bold());

    for variant in [Variant::ModuleOwner, Variant::FileOwner] {
        let gate = variant.gate_config();
        println!();
        println!("  {} {}", "•".green(), variant.as_str().yellow());
        println!("    endpoint: {}~{}", DEFAULT_PLUGIN_NAME, gate.endpoint_suffix);
        println!("    approved: {} ({})", gate.approved_text, gate.approved_color);
        println!("    denied:   {} ({})", gate.denied_text, gate.denied_color);
        println!("    hide submit button: {}", gate.hide_submit_control);
    }

    Ok(())
}

async fn show_menu(settings: Settings, anonymous: bool) -> Result<()> {
    let client = build_client(&settings.app)?;
    let account = resolve_account(client.as_ref(), anonymous).await?;

    match owners_menu(account, &settings.app.plugin_name) {
        Some(entry) => println!("{}", serde_json::to_string_pretty(&entry)?),
        None => println!("{}", "No menu entries for anonymous users".yellow()),
    }

    Ok(())
}

// ═══════════════════════════════════════════════════════════════════
// Main
// ═══════════════════════════════════════════════════════════════════

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match &cli.command {
        Commands::Variants => list_variants(),
        Commands::Check {
            change,
            revision,
            submit,
            anonymous,
        } => {
            let settings = load_settings(&cli)?;
            check(settings, RevisionRef::new(*change, *revision), *submit, *anonymous).await
        }
        Commands::Session { anonymous } => session(load_settings(&cli)?, *anonymous).await,
        Commands::Menu { anonymous } => show_menu(load_settings(&cli)?, *anonymous).await,
    }
}
