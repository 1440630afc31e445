use crate::client::ApiClient;
use crate::config::Settings;
use crate::prelude::{println, *};
use codeaura_core::action::ToolIds;
use codeaura_core::catalogue::ToolSummary;

#[derive(Debug, clap::Parser)]
#[command(name = "tools")]
#[command(about = "Inspect the backend's AI tool catalogue")]
pub struct App {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, clap::Subcommand)]
pub enum Commands {
    /// List available AI tools and the editor action each one serves
    #[clap(name = "list")]
    List(ListOptions),

    /// Show one AI tool
    #[clap(name = "get")]
    Get(GetOptions),
}

#[derive(Debug, Clone, clap::Args)]
pub struct ListOptions {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Clone, clap::Args)]
pub struct GetOptions {
    /// Tool id
    pub id: u32,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

pub async fn run(app: App, global: crate::Global) -> Result<()> {
    let settings = Settings::load(&global)?;
    let client = ApiClient::new(&settings)?;

    match app.command {
        Commands::List(options) => list(&client, &settings, options).await,
        Commands::Get(options) => get(&client, options).await,
    }
}

async fn list(client: &ApiClient, settings: &Settings, options: ListOptions) -> Result<()> {
    let catalogue = client.list_tools().await?;

    if options.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&catalogue)
                .map_err(|e| eyre!("JSON serialization failed: {}", e))?
        );
        return Ok(());
    }

    if catalogue.tools.is_empty() {
        println!("No AI tools available");
        return Ok(());
    }

    let resolved = ToolIds::resolve(&catalogue, settings.tool_ids);

    let mut table = new_table();
    table.add_row(prettytable::row!["Id", "Name", "Type", "Action", "Configured"]);
    for tool in &catalogue.tools {
        table.add_row(prettytable::row![
            tool.id,
            tool.name,
            tool.tool_type,
            action_label(tool),
            configured_marker(tool, &settings.tool_ids)
        ]);
    }
    table.printstd();

    if resolved != settings.tool_ids {
        println!();
        println!("Configured tool ids differ from the catalogue; pass --discover to use it.");
    }

    Ok(())
}

async fn get(client: &ApiClient, options: GetOptions) -> Result<()> {
    let tool = client.get_tool(options.id).await?;

    if options.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&tool)
                .map_err(|e| eyre!("JSON serialization failed: {}", e))?
        );
        return Ok(());
    }

    let mut table = new_table();
    table.add_row(prettytable::row!["Id", tool.id]);
    table.add_row(prettytable::row!["Name", tool.name]);
    table.add_row(prettytable::row!["Type", tool.tool_type]);
    table.add_row(prettytable::row!["Action", action_label(&tool)]);
    if let Some(endpoint) = &tool.api_endpoint {
        table.add_row(prettytable::row!["Endpoint", endpoint]);
    }
    table.printstd();

    if let Some(description) = &tool.description {
        println!();
        println!("{}", description);
    }

    Ok(())
}

fn action_label(tool: &ToolSummary) -> String {
    tool.action()
        .map(|action| action.to_string())
        .unwrap_or_else(|| "-".to_string())
}

/// `*` when the tool is the one configured for its action
fn configured_marker(tool: &ToolSummary, ids: &ToolIds) -> &'static str {
    match tool.action() {
        Some(action) if ids.get(action) == tool.id => "*",
        _ => "",
    }
}
