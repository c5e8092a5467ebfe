use llm_toolkit_service::openapi::openapi_document;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let document = openapi_document();
    let encoded = serde_json::to_string_pretty(&document)?;
    print!("{encoded}");
    Ok(())
}
