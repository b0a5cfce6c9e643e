use crate::allocator::ShareAllocator;
use crate::comment::format_breakdown;
use crate::config::Config;
use crate::directory::OwnerDirectory;
use crate::duplicate::{find_duplicate, ExpenseRecord};
use crate::error::{Result, SplitError};
use crate::extract::BillExtractor;
use crate::ledger::{CreatedExpense, Ledger, LedgerUser, NewExpense};
use crate::model::{Allocation, Bill, BillPeriod, NormalizationWarning};
use crate::normalizer::normalize;
use log::{debug, info, warn};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use tokio::sync::mpsc::Sender;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PipelineState {
    Extracting,
    Normalizing,
    Allocating,
    CheckingDuplicate,
    DryRunStop,
    Posting,
    Annotating,
    Done,
    Failed,
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineState::Extracting => "extracting",
            PipelineState::Normalizing => "normalizing",
            PipelineState::Allocating => "allocating",
            PipelineState::CheckingDuplicate => "checking for duplicates",
            PipelineState::DryRunStop => "dry run",
            PipelineState::Posting => "posting",
            PipelineState::Annotating => "annotating",
            PipelineState::Done => "done",
            PipelineState::Failed => "failed",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PipelineEvent {
    Entered(PipelineState),
    Extracted {
        characters: usize,
    },
    Normalized {
        period: BillPeriod,
        total_due: Decimal,
        lines: usize,
    },
    Warning(NormalizationWarning),
    Allocated(Allocation),
    Authenticated(LedgerUser),
    DuplicateChecked(Option<ExpenseRecord>),
    Posted(CreatedExpense),
    Commented {
        expense_id: u64,
    },
    Failed {
        state: PipelineState,
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Posted { expense_id: u64 },
    DryRun,
}

/// Everything computed by a successful run.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub bill: Bill,
    pub warnings: Vec<NormalizationWarning>,
    pub allocation: Allocation,
    pub expense: NewExpense,
    pub comment: String,
    pub outcome: Outcome,
}

impl RunReport {
    pub fn is_final(&self) -> bool {
        !self
            .warnings
            .iter()
            .any(|w| matches!(w, NormalizationWarning::UnresolvedOwner { .. }))
    }
}

/// Runs one bill from document to ledger:
/// extract → normalize → allocate → duplicate check → post → annotate.
pub struct Pipeline<E, L> {
    extractor: E,
    ledger: L,
    directory: OwnerDirectory,
    config: Config,
    dry_run: bool,
}

impl<E: BillExtractor, L: Ledger> Pipeline<E, L> {
    pub fn new(extractor: E, ledger: L, directory: OwnerDirectory, config: Config) -> Self {
        Self {
            extractor,
            ledger,
            directory,
            config,
            dry_run: false,
        }
    }

    /// Stop after the duplicate check without touching the ledger.
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    pub fn extractor(&self) -> &E {
        &self.extractor
    }

    pub async fn run(
        &self,
        bill_path: &Path,
        progress: Option<Sender<PipelineEvent>>,
    ) -> Result<RunReport> {
        let mut state = PipelineState::Extracting;

        match self.execute(bill_path, &progress, &mut state).await {
            Ok(report) => Ok(report),
            Err(e) => {
                if e.is_duplicate() {
                    info!("{}", e);
                } else {
                    warn!("Run failed while {}: {}", state, e);
                }
                self.send_event(
                    &progress,
                    PipelineEvent::Failed {
                        state,
                        reason: e.to_string(),
                    },
                )
                .await;
                self.send_event(&progress, PipelineEvent::Entered(PipelineState::Failed))
                    .await;
                Err(e)
            }
        }
    }

    async fn execute(
        &self,
        bill_path: &Path,
        progress: &Option<Sender<PipelineEvent>>,
        state: &mut PipelineState,
    ) -> Result<RunReport> {
        self.enter(progress, state, PipelineState::Extracting).await;
        info!("Extracting bill from {}", bill_path.display());
        let extraction = self.extractor.extract(bill_path).await?;
        self.send_event(
            progress,
            PipelineEvent::Extracted {
                characters: extraction.raw_text.chars().count(),
            },
        )
        .await;

        self.enter(progress, state, PipelineState::Normalizing).await;
        let normalized = normalize(&extraction.draft, &self.directory)?;
        let bill = normalized.bill;
        let warnings = normalized.warnings;
        info!(
            "Bill {}: total due ${:.2} across {} lines",
            bill.period(),
            bill.total_due,
            bill.lines.len()
        );
        self.send_event(
            progress,
            PipelineEvent::Normalized {
                period: bill.period(),
                total_due: bill.total_due,
                lines: bill.lines.len(),
            },
        )
        .await;
        for warning in &warnings {
            self.send_event(progress, PipelineEvent::Warning(warning.clone()))
                .await;
        }

        self.enter(progress, state, PipelineState::Allocating).await;
        let allocation = ShareAllocator::new(&self.config.payer_name).allocate(&bill)?;
        for share in &allocation.shares {
            debug!("  {}: ${:.2}", share.owner, share.subtotal);
        }
        self.send_event(progress, PipelineEvent::Allocated(allocation.clone()))
            .await;

        let description = self.config.describe(bill.period());
        let details = format!("Total due: ${:.2}", bill.total_due);
        let expense = NewExpense::from_allocation(&self.config, description, details, &allocation)?;
        let comment = format_breakdown(&bill, &allocation, &warnings);

        self.enter(progress, state, PipelineState::CheckingDuplicate)
            .await;
        let user = self.ledger.current_user().await?;
        info!("Connected to ledger as {}", user.first_name);
        self.send_event(progress, PipelineEvent::Authenticated(user))
            .await;

        let existing = self.ledger.list_expenses(self.config.group_id).await?;
        let duplicate = find_duplicate(self.config.group_id, bill.period(), existing);
        self.send_event(progress, PipelineEvent::DuplicateChecked(duplicate.clone()))
            .await;
        if let Some(found) = duplicate {
            return Err(SplitError::DuplicateFound {
                description: found.description,
                expense_id: found.id,
            });
        }

        if self.dry_run {
            self.enter(progress, state, PipelineState::DryRunStop).await;
            info!("Dry run: not posting '{}'", expense.description);
            return Ok(RunReport {
                bill,
                warnings,
                allocation,
                expense,
                comment,
                outcome: Outcome::DryRun,
            });
        }

        self.enter(progress, state, PipelineState::Posting).await;
        let created = self.ledger.create_expense(&expense).await?;
        info!(
            "Created expense {} '{}' for ${:.2}",
            created.id, created.description, created.cost
        );
        let expense_id = created.id;
        self.send_event(progress, PipelineEvent::Posted(created))
            .await;

        self.enter(progress, state, PipelineState::Annotating).await;
        self.ledger.add_comment(expense_id, &comment).await?;
        self.send_event(progress, PipelineEvent::Commented { expense_id })
            .await;

        self.enter(progress, state, PipelineState::Done).await;
        Ok(RunReport {
            bill,
            warnings,
            allocation,
            expense,
            comment,
            outcome: Outcome::Posted { expense_id },
        })
    }

    async fn enter(
        &self,
        progress: &Option<Sender<PipelineEvent>>,
        state: &mut PipelineState,
        next: PipelineState,
    ) {
        debug!("Pipeline: {} -> {}", state, next);
        *state = next;
        self.send_event(progress, PipelineEvent::Entered(next)).await;
    }

    async fn send_event(&self, sender: &Option<Sender<PipelineEvent>>, event: PipelineEvent) {
        if let Some(tx) = sender {
            let _ = tx.send(event).await;
        }
    }
}
