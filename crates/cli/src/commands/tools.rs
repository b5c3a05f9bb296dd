//! `ragpilot tools`: list the tools the assistant can call.

use ragpilot_tools::ToolCatalog;

use super::load_config;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config()?;
    let source = ragpilot_tools::build_from_config(&config);
    let catalog = ToolCatalog::new(source.provider());

    let listed = catalog.list_tools().await;
    source.shutdown().await;
    let tools = listed?;

    println!("Tools from {} ({}):", config.tools.source, tools.len());
    for tool in &tools {
        println!("  {:<12} {}", tool.name, tool.description);
    }
    if tools.is_empty() {
        println!("  (none)");
    }
    Ok(())
}
