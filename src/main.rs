use bill_splitter::llm::{ChatClient, LlmBillExtractor};
use bill_splitter::pdf::DEFAULT_MAX_PAGES;
use bill_splitter::splitwise::SplitwiseClient;
use bill_splitter::{
    Config, Credentials, OwnerDirectory, Outcome, Pipeline, PipelineEvent, PipelineState,
    Result, RunReport, SplitError,
};
use clap::Parser;
use dotenv::dotenv;
use std::path::PathBuf;
use tokio::sync::mpsc;

#[derive(Parser, Debug)]
#[command(
    name = "bill-splitter",
    version,
    about = "Split a T-Mobile bill between line owners and record it in Splitwise"
)]
struct Cli {
    /// Bill PDF to process
    bill: PathBuf,

    /// Compute and print everything, but do not create the expense
    #[arg(long)]
    dry_run: bool,

    /// Group, payer and user mapping settings
    #[arg(long, env = "BILL_SPLITTER_CONFIG", default_value = "private/config.json")]
    config: PathBuf,

    /// Phone owner list, one `<phone> - <name>` per line
    #[arg(long, env = "BILL_SPLITTER_OWNERS", default_value = "private/phone_owners.txt")]
    owners: PathBuf,

    /// Chat model used to structure the bill text (overrides OPENAI_MODEL)
    #[arg(long)]
    model: Option<String>,

    /// Number of PDF pages to read
    #[arg(long, default_value_t = DEFAULT_MAX_PAGES)]
    max_pages: u32,
}

fn print_event(event: &PipelineEvent) {
    match event {
        PipelineEvent::Entered(PipelineState::Extracting) => {
            println!("📄 Extracting bill text and parsing with the model...")
        }
        PipelineEvent::Entered(PipelineState::Allocating) => println!("🧮 Calculating shares..."),
        PipelineEvent::Entered(PipelineState::CheckingDuplicate) => {
            println!("🔍 Checking Splitwise for an existing expense...")
        }
        PipelineEvent::Entered(PipelineState::Posting) => println!("☁️  Creating expense..."),
        PipelineEvent::Entered(PipelineState::Annotating) => {
            println!("📝 Adding itemized breakdown comment...")
        }
        PipelineEvent::Entered(_) => {}
        PipelineEvent::Extracted { characters } => {
            println!("   ✅ Extracted {} characters", characters)
        }
        PipelineEvent::Normalized {
            period,
            total_due,
            lines,
        } => println!(
            "   ✅ Bill for {}: total due ${:.2}, {} lines",
            period, total_due, lines
        ),
        PipelineEvent::Warning(warning) => println!("   ⚠️  {}", warning),
        PipelineEvent::Allocated(allocation) => {
            for share in &allocation.shares {
                println!(
                    "   {:<12} ${:>8.2}  (line ${:.2}, equipment ${:.2}, one-time ${:.2}, shared ${:.2})",
                    share.owner,
                    share.subtotal,
                    share.line_charges,
                    share.equipment,
                    share.one_time,
                    share.shared
                );
            }
            println!("   {:<12} ${:>8.2}", "Total", allocation.total());
        }
        PipelineEvent::Authenticated(user) => {
            println!("   ✅ Connected as {}", user.first_name)
        }
        PipelineEvent::DuplicateChecked(None) => println!("   ✅ No duplicate found"),
        PipelineEvent::DuplicateChecked(Some(existing)) => println!(
            "   ⏭️  Already recorded: '{}' (${:.2}, id {})",
            existing.description, existing.cost, existing.id
        ),
        PipelineEvent::Posted(created) => println!(
            "   ✅ Created expense {} '{}' for ${:.2}",
            created.id, created.description, created.cost
        ),
        PipelineEvent::Commented { .. } => println!("   ✅ Breakdown comment added"),
        PipelineEvent::Failed { state, reason } => {
            println!("   ❌ Failed while {}: {}", state, reason)
        }
    }
}

fn print_report(report: &RunReport) {
    match &report.outcome {
        Outcome::DryRun => {
            println!("\n🧪 DRY RUN - would create expense:");
            println!("   Description: {}", report.expense.description);
            println!("   Details:     {}", report.expense.details);
            println!("   Group ID:    {}", report.expense.group_id);
            println!("   Total:       ${:.2}", report.expense.cost);
            println!("   Payer ID:    {}", report.expense.payer_id);
            println!("\nWould add this breakdown comment:\n{}", report.comment);
        }
        Outcome::Posted { expense_id } => {
            println!("\n✅ SUCCESS! Expense {} recorded.", expense_id);
        }
    }

    if !report.is_final() {
        println!("⚠️  Some lines have no known owner; fix the owner list and adjust the expense by hand.");
    }
}

async fn run(cli: Cli) -> Result<RunReport> {
    let config = Config::load(&cli.config)?;
    let directory = OwnerDirectory::load(&cli.owners)?;
    let credentials = Credentials::from_env()?;

    if !cli.bill.exists() {
        return Err(SplitError::Extraction(format!(
            "File not found: {}",
            cli.bill.display()
        )));
    }

    let chat = ChatClient::new(&credentials.openai_base_url, &credentials.openai_api_key)
        .with_api_version(credentials.openai_api_version.clone());
    let model = cli.model.clone().unwrap_or(credentials.model.clone());
    let extractor =
        LlmBillExtractor::new(chat, model, directory.clone()).with_max_pages(cli.max_pages);
    let ledger = SplitwiseClient::new(
        &credentials.splitwise_base_url,
        &credentials.splitwise_token,
    );

    let pipeline = Pipeline::new(extractor, ledger, directory, config).with_dry_run(cli.dry_run);

    let (tx, mut rx) = mpsc::channel(32);
    let printer = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            print_event(&event);
        }
    });

    let result = pipeline.run(&cli.bill, Some(tx)).await;
    let _ = printer.await;
    result
}

#[tokio::main]
async fn main() {
    dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    println!("🚀 Processing bill: {}\n", cli.bill.display());

    match run(cli).await {
        Ok(report) => print_report(&report),
        Err(e) if e.is_duplicate() => {
            println!("\n⏭️  Skipped: {}", e);
            std::process::exit(e.exit_code());
        }
        Err(e) => {
            eprintln!("\n❌ FAILED: {}", e);
            std::process::exit(e.exit_code());
        }
    }
}
