//! On-chain message handlers.
//!
//! [`MsgServer`] executes auction-module messages against the keeper and
//! the external bank/staking interfaces. Every handler runs the message's
//! stateless validation first, checks that the transaction signer is the
//! address the message names, then applies the stateful rules. Errors
//! abort the message but never the block.

use crate::store::KvStore;
use crate::types::{
    parse_coin_normalized, Builder, Context, ModuleError, Msg, MsgCommitSegment, MsgEditBuilder,
    MsgRegisterBuilder, MsgRegisterProposer, MsgReportProposer, MsgUpdateParams, Proposer,
};

use super::external::{BankKeeper, StakingKeeper};
use super::Keeper;

/// Executes messages against module state.
///
/// Borrows its collaborators at call time, like the other state-machine
/// entry points, so the caller stays in control of ownership.
pub struct MsgServer<'a, S: KvStore, B: BankKeeper, K: StakingKeeper> {
    keeper: &'a mut Keeper<S>,
    bank: &'a mut B,
    staking: &'a K,
}

impl<'a, S: KvStore, B: BankKeeper, K: StakingKeeper> MsgServer<'a, S, B, K> {
    pub fn new(keeper: &'a mut Keeper<S>, bank: &'a mut B, staking: &'a K) -> Self {
        Self {
            keeper,
            bank,
            staking,
        }
    }

    /// Validates and executes one message.
    ///
    /// `signer` is the account that signed the enclosing transaction; the
    /// envelope guarantees there is exactly one.
    pub fn execute(&mut self, ctx: &Context, msg: &Msg, signer: &str) -> Result<(), ModuleError> {
        msg.validate_basic()?;

        let expected = msg.signer()?;
        if expected != signer {
            return Err(ModuleError::InvalidSigner(format!(
                "want {expected:?}, have {signer:?}"
            )));
        }

        match msg {
            Msg::RegisterBuilder(m) => self.register_builder(ctx, m),
            Msg::EditBuilder(m) => self.edit_builder(ctx, m),
            Msg::RegisterProposer(m) => self.register_proposer(ctx, m),
            Msg::CommitSegment(m) => self.commit_segment(ctx, m),
            Msg::ReportProposer(m) => self.report_proposer(ctx, m),
            Msg::UpdateParams(m) => self.update_params(ctx, m),
        }
    }

    fn register_builder(&mut self, _ctx: &Context, msg: &MsgRegisterBuilder) -> Result<(), ModuleError> {
        if self.keeper.builder(&msg.address).is_some() {
            return Err(ModuleError::InvalidRequest("address already set".into()));
        }

        self.keeper.set_builder(&Builder {
            address: msg.address.clone(),
            pubkey: msg.pubkey.clone(),
            moniker: msg.moniker.clone(),
            builder_api_version: msg.builder_api_version.clone(),
            builder_api_url: msg.builder_api_url.clone(),
            security_contact: msg.security_contact.clone(),
        });

        Ok(())
    }

    fn edit_builder(&mut self, _ctx: &Context, msg: &MsgEditBuilder) -> Result<(), ModuleError> {
        let Some(mut builder) = self.keeper.builder(&msg.address) else {
            return Err(ModuleError::KeyNotFound("address not set".into()));
        };

        builder.moniker = msg.moniker.clone();
        builder.builder_api_version = msg.builder_api_version.clone();
        builder.builder_api_url = msg.builder_api_url.clone();
        builder.security_contact = msg.security_contact.clone();

        self.keeper.set_builder(&builder);

        Ok(())
    }

    fn register_proposer(&mut self, _ctx: &Context, msg: &MsgRegisterProposer) -> Result<(), ModuleError> {
        if self.keeper.proposer(&msg.address).is_some() {
            return Err(ModuleError::InvalidRequest(
                "proposer with given address already registered".into(),
            ));
        }

        let want = msg.pubkey.account_address();
        if msg.address != want {
            return Err(ModuleError::AddressPubKeyMismatch {
                have: msg.address.clone(),
                want,
            });
        }

        let want_operator = msg.operator_pubkey.operator_address();
        if msg.operator_address != want_operator {
            return Err(ModuleError::AddressPubKeyMismatch {
                have: msg.operator_address.clone(),
                want: want_operator,
            });
        }

        if self.staking.validator(&msg.operator_address).is_none() {
            return Err(ModuleError::InvalidRequest(
                "validator with given address not found".into(),
            ));
        }

        self.keeper.set_proposer(&Proposer {
            address: msg.address.clone(),
            pubkey: msg.pubkey.clone(),
            operator_address: msg.operator_address.clone(),
            operator_pubkey: msg.operator_pubkey.clone(),
        });

        Ok(())
    }

    fn commit_segment(&mut self, ctx: &Context, msg: &MsgCommitSegment) -> Result<(), ModuleError> {
        if msg.commitment.height != ctx.block_height {
            return Err(ModuleError::InvalidRequest(format!(
                "invalid segment commitment height: {} != {}",
                msg.commitment.height, ctx.block_height,
            )));
        }

        let Some(builder) = self.keeper.builder(&msg.builder_address) else {
            return Err(ModuleError::NotFound(format!(
                "builder {:?} not registered",
                msg.builder_address
            )));
        };

        let Some(proposer) = self.keeper.proposer(&msg.commitment.proposer_address) else {
            return Err(ModuleError::NotFound(format!(
                "proposer {:?} not registered",
                msg.commitment.proposer_address
            )));
        };

        msg.commitment
            .verify_signatures(&builder.pubkey, &proposer.pubkey)
            .map_err(|e| {
                ModuleError::InvalidRequest(format!("invalid segment commitment signatures: {e}"))
            })?;

        let payment = parse_coin_normalized(&msg.commitment.payment_promise)
            .map_err(|e| ModuleError::InvalidRequest(format!("invalid payment promise: {e}")))?;

        let module_account = self.keeper.module_account_address();
        self.bank
            .send_coins(&msg.builder_address, &module_account, &[payment])
            .map_err(|e| ModuleError::InvalidRequest(format!("send bid payment: {e}")))?;

        self.keeper.set_segment_commitment(&msg.commitment);

        Ok(())
    }

    fn report_proposer(&mut self, ctx: &Context, msg: &MsgReportProposer) -> Result<(), ModuleError> {
        let params = self.keeper.params();
        let age_blocks = ctx.block_height - msg.commitment.height;
        if age_blocks > params.max_evidence_age_num_blocks {
            return Err(ModuleError::InvalidRequest(format!(
                "evidence too old: proposer={:?} builder={:?} age_blocks={} max_age_blocks={}",
                msg.commitment.proposer_address,
                msg.commitment.builder_address,
                age_blocks,
                params.max_evidence_age_num_blocks,
            )));
        }

        let Some(builder) = self.keeper.builder(&msg.builder_address) else {
            return Err(ModuleError::NotFound(format!(
                "builder {:?} not registered",
                msg.builder_address
            )));
        };

        let Some(proposer) = self.keeper.proposer(&msg.commitment.proposer_address) else {
            return Err(ModuleError::NotFound(format!(
                "proposer {:?} not registered",
                msg.commitment.proposer_address
            )));
        };

        msg.commitment
            .verify_signatures(&builder.pubkey, &proposer.pubkey)
            .map_err(|e| {
                ModuleError::InvalidRequest(format!("invalid segment commitment signatures: {e}"))
            })?;

        // Both signatures check out, so if the commitment had been honored
        // there would be a matching record in state.
        if self
            .keeper
            .segment_commitment(&msg.commitment.signatures_hash())
            .is_some()
        {
            return Err(ModuleError::InvalidRequest(
                "segment commitment exists, nothing to report".into(),
            ));
        }

        self.keeper.set_proposer_infraction(&msg.commitment);

        Ok(())
    }

    fn update_params(&mut self, _ctx: &Context, msg: &MsgUpdateParams) -> Result<(), ModuleError> {
        if msg.authority != self.keeper.authority() {
            return Err(ModuleError::InvalidSigner(format!(
                "invalid authority; expected {:?}, got {:?}",
                self.keeper.authority(),
                msg.authority,
            )));
        }

        self.keeper.set_params(msg.params.clone())?;

        Ok(())
    }
}
