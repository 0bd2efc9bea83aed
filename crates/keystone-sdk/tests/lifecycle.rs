//! End-to-end intent lifecycle on an account configured by a small multisig
//! module, with a payments extension stacking actions into intents.

use keystone_core::{Clock, KeystoneError, ObjectId, Params};
use keystone_sdk::prelude::*;
use keystone_sdk::{config, owned};
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Config module: intents execute once enough members approved.
mod multisig {
    use std::collections::BTreeSet;

    use keystone_core::{Clock, Extensions, KeystoneError, Result, CORE_DEP_NAME};
    use keystone_sdk::prelude::*;

    pub const PACKAGE: Address = Address::from_u64(0x2);

    pub struct Multisig {
        members: BTreeSet<Address>,
        threshold: usize,
    }

    #[derive(Debug, Clone, Default)]
    pub struct Approvals {
        approved: BTreeSet<Address>,
    }

    impl AccountConfig for Multisig {
        type Outcome = Approvals;
        type Witness = Witness;

        fn validate_outcome(&self, outcome: Approvals, role: &str) -> Result<()> {
            if outcome.approved.len() < self.threshold {
                return Err(KeystoneError::OutcomeRejected {
                    role: role.to_string(),
                    reason: format!(
                        "{} of {} approvals",
                        outcome.approved.len(),
                        self.threshold
                    ),
                });
            }
            Ok(())
        }
    }

    #[derive(Clone, Copy)]
    pub struct Witness(());

    impl Provenance for Witness {
        const PACKAGE: Address = PACKAGE;
        const MODULE: &'static str = "multisig";
    }

    #[derive(Clone, Copy)]
    struct Version(());

    impl Provenance for Version {
        const PACKAGE: Address = PACKAGE;
        const MODULE: &'static str = "version";
    }

    fn version() -> VersionWitness {
        VersionWitness::new(Version(()))
    }

    pub fn extensions() -> Result<Extensions> {
        let mut extensions = keystone_sdk::version::core_extensions();
        extensions.add("Multisig", version(), 1)?;
        super::payments::publish(&mut extensions)?;
        Ok(extensions)
    }

    pub fn new_account(members: &[Address], threshold: usize) -> Result<Account<Multisig>> {
        let deps = Deps::new_latest_from_whitelist(
            &extensions()?,
            &[CORE_DEP_NAME, "Multisig", "Payments"],
        )?;
        let config = Multisig {
            members: members.iter().copied().collect(),
            threshold,
        };
        Account::new(config, deps, version(), Witness(()))
    }

    pub fn auth(account: &Account<Multisig>) -> Result<Auth> {
        account.new_auth(version(), Witness(()))
    }

    pub fn approve(account: &mut Account<Multisig>, key: &str, member: Address) -> Result<()> {
        if !account.config().members.contains(&member) {
            return Err(KeystoneError::OutcomeRejected {
                role: key.to_string(),
                reason: format!("{} is not a member", member),
            });
        }
        account
            .outcome_mut(key, version(), Witness(()))?
            .approved
            .insert(member);
        Ok(())
    }

    pub fn execute(
        account: &mut Account<Multisig>,
        key: &str,
        clock: &Clock,
    ) -> Result<Executable<Approvals>> {
        let (_, executable) = account.create_executable(key, clock, version(), Witness(()))?;
        Ok(executable)
    }
}

/// Extension paying out of the account and withdrawing objects it owns.
mod payments {
    use keystone_core::{Clock, Extensions, Params, Result};
    use keystone_sdk::prelude::*;
    use keystone_sdk::{build_intent, owned, process_intent};

    use super::multisig::{Approvals, Multisig};

    pub const PACKAGE: Address = Address::from_u64(0x3);

    #[derive(Debug, Hash, PartialEq, Eq)]
    struct Ledger;

    pub struct Pay {
        to: Address,
        amount: u64,
    }

    #[derive(Clone, Copy)]
    struct Version(());

    impl Provenance for Version {
        const PACKAGE: Address = PACKAGE;
        const MODULE: &'static str = "version";
    }

    #[derive(Clone, Copy)]
    struct PayrollIntent(());

    impl Provenance for PayrollIntent {
        const PACKAGE: Address = PACKAGE;
        const MODULE: &'static str = "payments";
    }

    #[derive(Clone, Copy)]
    struct WithdrawIntent(());

    impl Provenance for WithdrawIntent {
        const PACKAGE: Address = PACKAGE;
        const MODULE: &'static str = "withdraw";
    }

    fn version() -> VersionWitness {
        VersionWitness::new(Version(()))
    }

    pub fn publish(extensions: &mut Extensions) -> Result<()> {
        extensions.add("Payments", version(), 1)
    }

    pub fn install(account: &mut Account<Multisig>) -> Result<()> {
        account.add_managed_data(Ledger, Vec::<(Address, u64)>::new(), version())
    }

    pub fn paid(account: &Account<Multisig>) -> Result<Vec<(Address, u64)>> {
        Ok(account
            .borrow_managed_data::<_, Vec<(Address, u64)>>(&Ledger)?
            .clone())
    }

    pub fn propose_payroll(
        account: &mut Account<Multisig>,
        key: &str,
        execution_times: Vec<u64>,
        expiration_time: u64,
        pays: &[(Address, u64)],
    ) -> Result<()> {
        let params = Params::new(
            key,
            "payroll",
            execution_times,
            expiration_time,
            &Clock::at(0),
            Address::ZERO,
        )?;
        build_intent(
            account,
            params,
            Approvals::default(),
            "",
            version(),
            PayrollIntent(()),
            |intent, _, iw| {
                for &(to, amount) in pays {
                    intent.add_action(Pay { to, amount }, iw)?;
                }
                Ok(())
            },
        )
    }

    pub fn next_payment(executable: &mut Executable<Approvals>) -> Result<(Address, u64)> {
        let pay = executable.next_action::<Pay, _>(PayrollIntent(()))?;
        Ok((pay.to, pay.amount))
    }

    pub fn execute_payroll(
        account: &mut Account<Multisig>,
        executable: &mut Executable<Approvals>,
    ) -> Result<()> {
        process_intent(
            account,
            executable,
            version(),
            PayrollIntent(()),
            |executable, account, iw| {
                while !executable.is_complete() {
                    let pay = executable.next_action::<Pay, _>(iw)?;
                    let entry = (pay.to, pay.amount);
                    account
                        .borrow_managed_data_mut::<_, Vec<(Address, u64)>>(&Ledger, version())?
                        .push(entry);
                }
                Ok(())
            },
        )
    }

    pub fn clean_payroll(expired: &mut Expired) -> Result<()> {
        while !expired.is_empty() {
            expired.remove_action::<Pay>()?;
        }
        Ok(())
    }

    pub fn propose_withdraw(
        account: &mut Account<Multisig>,
        key: &str,
        object_id: ObjectId,
    ) -> Result<()> {
        propose_withdraw_all(account, key, &[object_id])
    }

    /// One intent withdrawing every object in `object_ids`, in order.
    pub fn propose_withdraw_all(
        account: &mut Account<Multisig>,
        key: &str,
        object_ids: &[ObjectId],
    ) -> Result<()> {
        let params = Params::new(key, "withdraw", vec![0], 1_000, &Clock::at(0), Address::ZERO)?;
        build_intent(
            account,
            params,
            Approvals::default(),
            "",
            version(),
            WithdrawIntent(()),
            |intent, account, iw| {
                for &object_id in object_ids {
                    owned::request_withdraw(intent, account, object_id, iw)?;
                }
                Ok(())
            },
        )
    }

    pub fn execute_withdraw<A: Asset>(
        account: &mut Account<Multisig>,
        executable: &mut Executable<Approvals>,
        received: A,
    ) -> Result<A> {
        process_intent(
            account,
            executable,
            version(),
            WithdrawIntent(()),
            |executable, account, iw| owned::do_withdraw(executable, account, received, iw),
        )
    }
}

/// Witness of a module that did not produce any of the intents.
#[derive(Clone, Copy)]
struct Rogue;

impl Provenance for Rogue {
    const PACKAGE: Address = payments::PACKAGE;
    const MODULE: &'static str = "rogue";
}

struct Coin(ObjectId);

impl Asset for Coin {
    fn id(&self) -> ObjectId {
        self.0
    }
}

fn alice() -> Address {
    Address::from_seed("alice")
}

fn bob() -> Address {
    Address::from_seed("bob")
}

fn setup(threshold: usize) -> anyhow::Result<Account<multisig::Multisig>> {
    init_tracing();
    let mut account = multisig::new_account(&[alice(), bob()], threshold)?;
    payments::install(&mut account)?;
    Ok(account)
}

fn approve_all(account: &mut Account<multisig::Multisig>, key: &str) -> anyhow::Result<()> {
    multisig::approve(account, key, alice())?;
    multisig::approve(account, key, bob())?;
    Ok(())
}

#[test]
fn test_recurring_payroll() -> anyhow::Result<()> {
    let mut account = setup(2)?;
    let carol = Address::from_seed("carol");
    payments::propose_payroll(&mut account, "salary", vec![10, 20], 100, &[(carol, 50)])?;
    approve_all(&mut account, "salary")?;

    let mut executable = multisig::execute(&mut account, "salary", &Clock::at(10))?;
    payments::execute_payroll(&mut account, &mut executable)?;
    account.confirm_execution(executable)?;

    assert!(account.intents().contains("salary"));
    assert!(matches!(
        account.destroy_empty_intent("salary"),
        Err(KeystoneError::CantBeRemovedYet { remaining: 1, .. })
    ));
    assert!(matches!(
        multisig::execute(&mut account, "salary", &Clock::at(15)),
        Err(KeystoneError::CantBeExecutedYet { execution_time: 20, .. })
    ));

    let mut executable = multisig::execute(&mut account, "salary", &Clock::at(20))?;
    payments::execute_payroll(&mut account, &mut executable)?;
    account.confirm_execution(executable)?;

    let mut expired = account.destroy_empty_intent("salary")?;
    payments::clean_payroll(&mut expired)?;
    expired.destroy_empty()?;

    assert!(account.intents().is_empty());
    assert_eq!(payments::paid(&account)?, vec![(carol, 50), (carol, 50)]);
    Ok(())
}

#[test]
fn test_outcome_must_be_approved() -> anyhow::Result<()> {
    let mut account = setup(2)?;
    payments::propose_payroll(&mut account, "salary", vec![10], 100, &[(bob(), 1)])?;
    multisig::approve(&mut account, "salary", alice())?;

    assert!(matches!(
        multisig::execute(&mut account, "salary", &Clock::at(10)),
        Err(KeystoneError::OutcomeRejected { .. })
    ));
    assert!(multisig::approve(&mut account, "salary", Address::from_seed("mallory")).is_err());
    assert_eq!(account.intents().get("salary")?.execution_times().len(), 1);

    multisig::approve(&mut account, "salary", bob())?;
    let mut executable = multisig::execute(&mut account, "salary", &Clock::at(10))?;
    payments::execute_payroll(&mut account, &mut executable)?;
    account.confirm_execution(executable)?;
    Ok(())
}

#[test]
fn test_withdrawal_locks_object() -> anyhow::Result<()> {
    let mut account = setup(1)?;
    let coin = ObjectId::new();

    payments::propose_withdraw(&mut account, "first", coin)?;
    assert!(account.intents().is_locked(coin));
    assert_eq!(
        payments::propose_withdraw(&mut account, "second", coin),
        Err(KeystoneError::ObjectAlreadyLocked(coin))
    );
    assert!(!account.intents().contains("second"));

    multisig::approve(&mut account, "first", alice())?;
    let mut executable = multisig::execute(&mut account, "first", &Clock::at(0))?;
    let received = payments::execute_withdraw(&mut account, &mut executable, Coin(coin))?;
    account.confirm_execution(executable)?;
    assert_eq!(received.id(), coin);

    assert!(!account.intents().is_locked(coin));
    payments::propose_withdraw(&mut account, "second", coin)?;
    assert!(account.intents().is_locked(coin));
    Ok(())
}

#[test]
fn test_rejected_withdrawal_keeps_lock_set() -> anyhow::Result<()> {
    let mut account = setup(1)?;
    let reserved = ObjectId::new();
    let spare = ObjectId::new();

    payments::propose_withdraw(&mut account, "dup", reserved)?;
    let before = account.intents().locked().clone();

    // Same key: refused before any lock is taken.
    assert_eq!(
        payments::propose_withdraw(&mut account, "dup", spare),
        Err(KeystoneError::KeyAlreadyExists("dup".to_string()))
    );
    assert_eq!(account.intents().locked(), &before);

    // Fresh key, but the second withdrawal hits a locked object: the first
    // one's lock is rolled back.
    assert_eq!(
        payments::propose_withdraw_all(&mut account, "batch", &[spare, reserved]),
        Err(KeystoneError::ObjectAlreadyLocked(reserved))
    );
    assert_eq!(account.intents().locked(), &before);
    assert!(!account.intents().contains("batch"));

    payments::propose_withdraw(&mut account, "spare", spare)?;
    assert!(account.intents().is_locked(spare));
    Ok(())
}

#[test]
fn test_foreign_confirm_keeps_source_consistent() -> anyhow::Result<()> {
    let mut home = setup(1)?;
    let mut other = setup(1)?;
    let coin = ObjectId::new();

    payments::propose_withdraw(&mut home, "x", coin)?;
    multisig::approve(&mut home, "x", alice())?;
    let executable = multisig::execute(&mut home, "x", &Clock::at(0))?;

    let refused = other.confirm_execution(executable).unwrap_err();
    assert!(matches!(refused.error(), KeystoneError::WrongAccount { .. }));
    assert!(other.intents().is_empty());
    let mut executable = refused
        .into_executable()
        .ok_or_else(|| anyhow::anyhow!("executable not handed back"))?;

    // Still in flight on its own account, lock held.
    assert!(home.intents().is_locked(coin));
    assert_eq!(
        payments::propose_withdraw(&mut home, "x", ObjectId::new()),
        Err(KeystoneError::KeyAlreadyExists("x".to_string()))
    );

    payments::execute_withdraw(&mut home, &mut executable, Coin(coin))?;
    home.confirm_execution(executable)?;
    assert!(home.intents().contains("x"));
    assert!(!home.intents().is_locked(coin));

    let mut expired = home.destroy_empty_intent("x")?;
    owned::delete_withdraw(&mut expired, &mut home)?;
    expired.destroy_empty()?;
    assert!(home.intents().is_empty());
    assert!(home.intents().locked().is_empty());
    Ok(())
}

#[test]
fn test_actions_are_fifo_and_producer_checked() -> anyhow::Result<()> {
    let mut account = setup(0)?;
    let pays = [(alice(), 1), (bob(), 2), (alice(), 3)];
    payments::propose_payroll(&mut account, "batch", vec![1], 100, &pays)?;

    let mut executable = multisig::execute(&mut account, "batch", &Clock::at(1))?;
    for expected in pays {
        assert!(matches!(
            executable.next_action::<payments::Pay, _>(Rogue),
            Err(KeystoneError::WrongWitness { .. })
        ));
        assert_eq!(payments::next_payment(&mut executable)?, expected);
    }
    account.confirm_execution(executable)?;
    Ok(())
}

#[test]
fn test_confirm_requires_every_action() -> anyhow::Result<()> {
    let pays = [(alice(), 1), (bob(), 2), (alice(), 3)];
    for processed in 0..=pays.len() {
        let mut account = setup(0)?;
        payments::propose_payroll(&mut account, "batch", vec![1], 100, &pays)?;

        let mut executable = multisig::execute(&mut account, "batch", &Clock::at(1))?;
        for _ in 0..processed {
            payments::next_payment(&mut executable)?;
        }
        let result = account.confirm_execution(executable);

        if processed == pays.len() {
            assert!(result.is_ok());
            assert!(account.intents().get("batch")?.execution_times().is_empty());
        } else {
            let refused = result.unwrap_err();
            assert!(!refused.is_returned());
            assert_eq!(
                refused.error(),
                &KeystoneError::ActionsRemaining {
                    key: "batch".to_string(),
                    remaining: pays.len() - processed,
                }
            );
            // The intent is back in the queue, due again.
            let mut executable = multisig::execute(&mut account, "batch", &Clock::at(1))?;
            payments::execute_payroll(&mut account, &mut executable)?;
            account.confirm_execution(executable)?;
        }
    }
    Ok(())
}

#[test]
fn test_expiration_boundary() -> anyhow::Result<()> {
    let mut account = setup(2)?;
    payments::propose_payroll(&mut account, "stale", vec![10], 100, &[(bob(), 1)])?;

    assert!(matches!(
        account.delete_expired_intent("stale", &Clock::at(99)),
        Err(KeystoneError::HasntExpired { .. })
    ));

    let mut expired = account.delete_expired_intent("stale", &Clock::at(100))?;
    assert!(matches!(
        expired.remove_action::<Coin>(),
        Err(KeystoneError::WrongActionType { index: 0, .. })
    ));
    payments::clean_payroll(&mut expired)?;
    expired.destroy_empty()?;
    assert!(payments::paid(&account)?.is_empty());
    Ok(())
}

#[test]
fn test_config_metadata_through_approval() -> anyhow::Result<()> {
    let mut account = setup(2)?;
    let params = Params::new("rename", "", vec![5], 50, &Clock::at(0), alice())?;
    let auth = multisig::auth(&account)?;
    config::request_config_metadata(
        auth,
        &mut account,
        params,
        Default::default(),
        vec!["name".to_string()],
        vec!["Payroll DAO".to_string()],
    )?;
    approve_all(&mut account, "rename")?;

    let mut executable = multisig::execute(&mut account, "rename", &Clock::at(5))?;
    config::execute_config_metadata(&mut executable, &mut account)?;
    account.confirm_execution(executable)?;
    assert_eq!(account.metadata().name(), Some("Payroll DAO"));

    let mut expired = account.destroy_empty_intent("rename")?;
    config::delete_config_metadata(&mut expired)?;
    expired.destroy_empty()?;
    Ok(())
}

#[test]
#[should_panic(expected = "dropped before being consumed")]
fn test_unconsumed_executable_panics() {
    let mut account = setup(0).unwrap();
    payments::propose_payroll(&mut account, "batch", vec![1], 100, &[(bob(), 1)]).unwrap();
    let executable = multisig::execute(&mut account, "batch", &Clock::at(1)).unwrap();
    drop(executable);
}
