//! Two-phase relay: submit through the caller's identity, then read the
//! outcome back from the logs of the block the submission landed in.

use std::sync::Arc;

use log::{debug, warn};

use crate::error::{VerificationError, Result};
use crate::identity::IdentityResolver;
use crate::ledger::{Address, Hash32, Identity, LedgerClient, LedgerEvent, LogFilter};

use super::call::{CallData, ClaimFunction};
use super::outcome::RelayOutcome;

/// Who submits a relayed call and what value it carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecOptions {
    pub from: Address,
    pub value: u128,
}

impl ExecOptions {
    pub fn from(account: Address) -> Self {
        Self {
            from: account,
            value: 0,
        }
    }

    pub fn with_value(mut self, value: u128) -> Self {
        self.value = value;
        self
    }
}

/// A relayed call that has been mined but not yet correlated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub subject: Address,
    /// Identity contract the call was relayed through.
    pub executor: Address,
    /// Claim holder the call was addressed to.
    pub target: Address,
    pub tx_hash: Hash32,
    pub block_number: u64,
    /// Taken from the executor's `Approved` event in the receipt.
    pub execution_id: Option<u64>,
}

/// Executes claim-holder functions on behalf of a subject's identity.
pub struct MetaTransactionRelay {
    ledger: Arc<dyn LedgerClient>,
    resolver: Arc<IdentityResolver>,
}

impl MetaTransactionRelay {
    pub fn new(ledger: Arc<dyn LedgerClient>, resolver: Arc<IdentityResolver>) -> Self {
        Self { ledger, resolver }
    }

    /// Submit `function` for `subject`'s claim holder.
    ///
    /// The caller (`opts.from`) must own an account identity; that identity
    /// is the executor the call is relayed through.
    pub async fn submit(
        &self,
        subject: &Address,
        function: ClaimFunction,
        opts: ExecOptions,
    ) -> Result<Submission> {
        let target_identity = self.resolver.resolve(subject).await?.identity;
        let target = match target_identity {
            Identity::Account(identity) => identity,
            Identity::Contract(_) => self.ledger.claim_registry(),
        };

        let executor = match self.resolver.resolve(&opts.from).await?.identity {
            Identity::Account(identity) => identity,
            Identity::Contract(_) => {
                return Err(VerificationError::Unauthorized {
                    account: opts.from,
                    topic: "-".into(),
                    action: "relay calls through a contract identity".into(),
                })
            }
        };

        let name = function.name();
        let call = CallData::for_identity(&target_identity, function);
        let receipt = self
            .ledger
            .execute(&opts.from, &executor, &target, call.encode()?, opts.value)
            .await?;

        let execution_id = receipt.logs.iter().find_map(|log| match log.event {
            LedgerEvent::Approved { execution_id, .. } if log.address == executor => {
                Some(execution_id)
            }
            _ => None,
        });
        debug!(
            "relayed {name} for {subject} via {executor} in block {} (execution {:?})",
            receipt.block_number, execution_id
        );

        Ok(Submission {
            subject: *subject,
            executor,
            target,
            tx_hash: receipt.tx_hash,
            block_number: receipt.block_number,
            execution_id,
        })
    }

    /// Scan the executor's logs in the submission block for the outcome
    /// event matching the execution id.
    pub async fn resolve(&self, submission: &Submission) -> Result<RelayOutcome<()>> {
        let Some(execution_id) = submission.execution_id else {
            return Ok(RelayOutcome::Indeterminate {
                execution_id: None,
                block_number: submission.block_number,
                reason: "receipt carries no Approved event".into(),
            });
        };

        let logs = self
            .ledger
            .logs(&LogFilter::in_block(
                submission.executor,
                submission.block_number,
            ))
            .await?;

        for log in &logs {
            match log.event {
                LedgerEvent::Executed {
                    execution_id: id, ..
                } if id == execution_id => return Ok(RelayOutcome::Success(())),
                LedgerEvent::ExecutionFailed {
                    execution_id: id, ..
                } if id == execution_id => {
                    return Ok(RelayOutcome::Failed {
                        execution_id,
                        target: submission.target,
                    })
                }
                _ => {}
            }
        }

        warn!(
            "execution {execution_id} on {} left no outcome event in block {}",
            submission.executor, submission.block_number
        );
        Ok(RelayOutcome::Indeterminate {
            execution_id: Some(execution_id),
            block_number: submission.block_number,
            reason: "neither Executed nor ExecutionFailed was emitted".into(),
        })
    }

    /// Scan the target's logs in the submission block and return the last
    /// event `extract` accepts.
    pub async fn extract<T, F>(&self, submission: &Submission, extract: F) -> Result<Option<T>>
    where
        F: Fn(&LedgerEvent) -> Option<T>,
    {
        let logs = self
            .ledger
            .logs(&LogFilter::in_block(
                submission.target,
                submission.block_number,
            ))
            .await?;
        Ok(logs.iter().rev().find_map(|log| extract(&log.event)))
    }

    /// Relay `function` and report whether the inner call succeeded.
    pub async fn execute_on_identity(
        &self,
        subject: &Address,
        function: ClaimFunction,
        opts: ExecOptions,
    ) -> Result<RelayOutcome<()>> {
        let submission = self.submit(subject, function, opts).await?;
        self.resolve(&submission).await
    }

    /// Relay `function` and extract its result from the inner call's events.
    ///
    /// A successful execution whose inner event cannot be found is
    /// `Indeterminate`.
    pub async fn execute_on_identity_with<T, F>(
        &self,
        subject: &Address,
        function: ClaimFunction,
        opts: ExecOptions,
        extract: F,
    ) -> Result<RelayOutcome<T>>
    where
        T: Send,
        F: Fn(&LedgerEvent) -> Option<T> + Send + Sync,
    {
        let submission = self.submit(subject, function, opts).await?;
        match self.resolve(&submission).await? {
            RelayOutcome::Success(()) => match self.extract(&submission, extract).await? {
                Some(value) => Ok(RelayOutcome::Success(value)),
                None => Ok(RelayOutcome::Indeterminate {
                    execution_id: submission.execution_id,
                    block_number: submission.block_number,
                    reason: format!("no inner event on {}", submission.target),
                }),
            },
            RelayOutcome::Failed {
                execution_id,
                target,
            } => Ok(RelayOutcome::Failed {
                execution_id,
                target,
            }),
            RelayOutcome::Indeterminate {
                execution_id,
                block_number,
                reason,
            } => Ok(RelayOutcome::Indeterminate {
                execution_id,
                block_number,
                reason,
            }),
        }
    }
}
