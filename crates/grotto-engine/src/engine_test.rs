//! Engine tests against in-memory doubles for the transaction and ledger.

use super::*;
use chrono::{TimeZone, Utc};
use grotto_core::{CoreError, CoreResult};
use grotto_db::{DbError, DbResult, LedgerEntry};
use std::cell::RefCell;
use std::rc::Rc;

// ── Doubles ────────────────────────────────────────────────────────────

/// Durable state of the fake database, shared by every transaction.
#[derive(Default)]
struct FakeState {
    ledger: Vec<String>,
    effects: Vec<String>,
    events: Vec<String>,
    fail_script: Option<String>,
    fail_commit: bool,
    fail_rollback: bool,
}

#[derive(Clone, Default)]
struct FakeDb(Rc<RefCell<FakeState>>);

impl FakeDb {
    fn begin(&self) -> FakeTx {
        FakeTx {
            db: self.clone(),
            ledger: RefCell::new(Vec::new()),
            effects: RefCell::new(Vec::new()),
        }
    }

    fn seed_ledger(&self, name: &str) {
        self.0.borrow_mut().ledger.push(name.to_string());
    }

    fn ledger(&self) -> Vec<String> {
        self.0.borrow().ledger.clone()
    }

    fn effects(&self) -> Vec<String> {
        self.0.borrow().effects.clone()
    }

    fn events(&self) -> Vec<String> {
        self.0.borrow().events.clone()
    }

    fn event(&self, event: impl Into<String>) {
        self.0.borrow_mut().events.push(event.into());
    }
}

/// Changes stay local to the transaction until commit.
struct FakeTx {
    db: FakeDb,
    ledger: RefCell<Vec<String>>,
    effects: RefCell<Vec<String>>,
}

impl FakeTx {
    fn sees(&self, name: &str) -> bool {
        self.db.0.borrow().ledger.iter().any(|n| n == name)
            || self.ledger.borrow().iter().any(|n| n == name)
    }
}

impl ScriptTransaction for FakeTx {
    fn execute_script(&self, script: &ScriptUnit) -> DbResult<()> {
        self.db.event(format!("exec:{}", script.name));
        if self.db.0.borrow().fail_script.as_deref() == Some(script.name.as_str()) {
            return Err(DbError::ScriptExecutionFailed {
                script: script.name.to_string(),
                message: "syntax error".to_string(),
            });
        }
        self.effects.borrow_mut().push(script.content.clone());
        Ok(())
    }

    fn commit(self) -> DbResult<()> {
        self.db.event("commit");
        let mut state = self.db.0.borrow_mut();
        if state.fail_commit {
            return Err(DbError::CommitFailed("disk full".to_string()));
        }
        state.ledger.extend(self.ledger.take());
        state.effects.extend(self.effects.take());
        Ok(())
    }

    fn rollback(self) -> DbResult<()> {
        self.db.event("rollback");
        if self.db.0.borrow().fail_rollback {
            return Err(DbError::RollbackFailed("connection lost".to_string()));
        }
        Ok(())
    }
}

#[derive(Default)]
struct FakeLedger {
    fail_create: bool,
    fail_query: Option<String>,
    fail_write: Option<String>,
}

impl MigrationLedger<FakeTx> for FakeLedger {
    fn ensure_table_exists(&self, tx: &FakeTx) -> DbResult<()> {
        tx.db.event("ensure");
        if self.fail_create {
            return Err(DbError::TableCreationFailed("permission denied".to_string()));
        }
        Ok(())
    }

    fn has_applied(&self, tx: &FakeTx, name: &ScriptName) -> DbResult<bool> {
        if self.fail_query.as_deref() == Some(name.as_str()) {
            return Err(DbError::LedgerQueryFailed {
                script: name.to_string(),
                message: "query failed".to_string(),
            });
        }
        Ok(tx.sees(name))
    }

    fn record_applied(&self, tx: &FakeTx, name: &ScriptName) -> DbResult<()> {
        tx.db.event(format!("record:{name}"));
        if self.fail_write.as_deref() == Some(name.as_str()) || tx.sees(name) {
            return Err(DbError::LedgerWriteFailed {
                script: name.to_string(),
                message: "unique constraint".to_string(),
            });
        }
        tx.ledger.borrow_mut().push(name.to_string());
        Ok(())
    }

    fn applied_entries(&self, tx: &FakeTx) -> DbResult<Vec<LedgerEntry>> {
        let committed = tx.db.ledger();
        let pending = tx.ledger.borrow().clone();
        Ok(committed
            .into_iter()
            .chain(pending)
            .enumerate()
            .map(|(idx, script_name)| LedgerEntry {
                id: idx as i64 + 1,
                script_name,
                applied_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, idx as u32).unwrap(),
            })
            .collect())
    }
}

struct FailingSource;

impl ScriptProvider for FailingSource {
    fn scripts(&self) -> CoreResult<Vec<ScriptUnit>> {
        Err(CoreError::DirectoryUnreadable {
            path: "migrations".to_string(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
        })
    }
}

// ── Helpers ────────────────────────────────────────────────────────────

fn script(name: &str, sql: &str) -> ScriptUnit {
    ScriptUnit::new(ScriptName::new(name), sql)
}

fn abc() -> Vec<ScriptUnit> {
    vec![
        script("a.sql", "CREATE TABLE a;"),
        script("b.sql", "CREATE TABLE b;"),
        script("c.sql", "CREATE TABLE c;"),
    ]
}

fn names(list: &[ScriptName]) -> Vec<&str> {
    list.iter().map(|n| n.as_str()).collect()
}

fn committed(outcome: RunOutcome) -> RunReport {
    match outcome {
        RunOutcome::Committed(report) => report,
        RunOutcome::RolledBack(failure) => panic!("expected commit, got {failure}"),
    }
}

fn rolled_back(outcome: RunOutcome) -> RunFailure {
    match outcome {
        RunOutcome::RolledBack(failure) => failure,
        RunOutcome::Committed(report) => panic!("expected rollback, got {report:?}"),
    }
}

// ── Successful runs ────────────────────────────────────────────────────

#[test]
fn test_empty_source_still_ensures_ledger_and_commits() {
    let db = FakeDb::default();
    let engine = MigrationEngine::new(Vec::<ScriptUnit>::new(), FakeLedger::default());

    let report = committed(engine.run(db.begin()).unwrap());

    assert_eq!(report.total(), 0);
    assert_eq!(db.events(), vec!["ensure", "commit"]);
}

#[test]
fn test_applies_in_order_and_records_each() {
    let db = FakeDb::default();
    let engine = MigrationEngine::new(abc(), FakeLedger::default());

    let report = committed(engine.run(db.begin()).unwrap());

    assert_eq!(names(&report.applied), vec!["a.sql", "b.sql", "c.sql"]);
    assert!(report.skipped.is_empty());
    assert_eq!(db.ledger(), vec!["a.sql", "b.sql", "c.sql"]);
    assert_eq!(
        db.events(),
        vec![
            "ensure",
            "exec:a.sql",
            "record:a.sql",
            "exec:b.sql",
            "record:b.sql",
            "exec:c.sql",
            "record:c.sql",
            "commit"
        ]
    );
}

#[test]
fn test_source_order_wins_over_construction_order() {
    let db = FakeDb::default();
    let scripts = vec![
        script("2_add_column.sql", "SELECT 2;"),
        script("10_add_index.sql", "SELECT 10;"),
    ];
    let engine = MigrationEngine::new(scripts, FakeLedger::default());

    let report = committed(engine.run(db.begin()).unwrap());

    assert_eq!(
        names(&report.applied),
        vec!["10_add_index.sql", "2_add_column.sql"]
    );
}

#[test]
fn test_second_run_applies_nothing() {
    let db = FakeDb::default();
    let engine = MigrationEngine::new(abc(), FakeLedger::default());

    committed(engine.run(db.begin()).unwrap());
    let second = committed(engine.run(db.begin()).unwrap());

    assert!(second.applied.is_empty());
    assert_eq!(names(&second.skipped), vec!["a.sql", "b.sql", "c.sql"]);
    assert_eq!(db.ledger().len(), 3);
    assert_eq!(db.effects().len(), 3);
}

#[test]
fn test_skips_already_applied() {
    let db = FakeDb::default();
    db.seed_ledger("a.sql");
    let scripts = vec![script("a.sql", "A;"), script("b.sql", "B;")];
    let engine = MigrationEngine::new(scripts, FakeLedger::default());

    let report = committed(engine.run(db.begin()).unwrap());

    assert_eq!(names(&report.applied), vec!["b.sql"]);
    assert_eq!(names(&report.skipped), vec!["a.sql"]);
    assert_eq!(db.effects(), vec!["B;"]);
    assert!(!db.events().contains(&"exec:a.sql".to_string()));
}

#[test]
fn test_blank_script_recorded_without_execution() {
    let db = FakeDb::default();
    let scripts = vec![script("a.sql", "  \n"), script("b.sql", "B;")];
    let engine = MigrationEngine::new(scripts, FakeLedger::default());

    let report = committed(engine.run(db.begin()).unwrap());

    assert_eq!(names(&report.applied), vec!["a.sql", "b.sql"]);
    assert_eq!(names(&report.blank), vec!["a.sql"]);
    assert_eq!(db.ledger(), vec!["a.sql", "b.sql"]);
    assert!(!db.events().contains(&"exec:a.sql".to_string()));

    // Recorded blanks are skipped like any other script next time
    let again = committed(engine.run(db.begin()).unwrap());
    assert_eq!(again.skipped.len(), 2);
}

// ── Failed runs ────────────────────────────────────────────────────────

#[test]
fn test_script_failure_rolls_back_everything() {
    let db = FakeDb::default();
    db.0.borrow_mut().fail_script = Some("b.sql".to_string());
    let engine = MigrationEngine::new(abc(), FakeLedger::default());

    let failure = rolled_back(engine.run(db.begin()).unwrap());

    assert_eq!(failure.script.as_ref().map(|s| s.as_str()), Some("b.sql"));
    assert!(matches!(
        failure.cause,
        EngineError::Db(DbError::ScriptExecutionFailed { .. })
    ));
    assert_eq!(names(&failure.report.applied), vec!["a.sql"]);
    assert!(db.ledger().is_empty());
    assert!(db.effects().is_empty());
    let events = db.events();
    assert!(!events.contains(&"exec:c.sql".to_string()));
    assert_eq!(events.last().map(String::as_str), Some("rollback"));
    assert!(failure.to_string().contains("b.sql"));
}

#[test]
fn test_ledger_creation_failure_runs_nothing() {
    let db = FakeDb::default();
    let ledger = FakeLedger {
        fail_create: true,
        ..FakeLedger::default()
    };
    let engine = MigrationEngine::new(abc(), ledger);

    let failure = rolled_back(engine.run(db.begin()).unwrap());

    assert!(failure.script.is_none());
    assert!(matches!(
        failure.cause,
        EngineError::Db(DbError::TableCreationFailed(_))
    ));
    assert_eq!(db.events(), vec!["ensure", "rollback"]);
}

#[test]
fn test_source_failure_rolls_back() {
    let db = FakeDb::default();
    let engine = MigrationEngine::new(FailingSource, FakeLedger::default());

    let failure = rolled_back(engine.run(db.begin()).unwrap());

    assert!(failure.script.is_none());
    assert!(matches!(
        failure.cause,
        EngineError::Source(CoreError::DirectoryUnreadable { .. })
    ));
    assert_eq!(db.events(), vec!["ensure", "rollback"]);
}

#[test]
fn test_ledger_query_failure_aborts() {
    let db = FakeDb::default();
    let ledger = FakeLedger {
        fail_query: Some("b.sql".to_string()),
        ..FakeLedger::default()
    };
    let engine = MigrationEngine::new(abc(), ledger);

    let failure = rolled_back(engine.run(db.begin()).unwrap());

    assert_eq!(failure.script.as_ref().map(|s| s.as_str()), Some("b.sql"));
    assert!(matches!(
        failure.cause,
        EngineError::Db(DbError::LedgerQueryFailed { .. })
    ));
    assert!(!db.events().contains(&"exec:b.sql".to_string()));
    assert!(db.ledger().is_empty());
}

#[test]
fn test_ledger_write_failure_aborts_after_execution() {
    let db = FakeDb::default();
    let ledger = FakeLedger {
        fail_write: Some("a.sql".to_string()),
        ..FakeLedger::default()
    };
    let engine = MigrationEngine::new(abc(), ledger);

    let failure = rolled_back(engine.run(db.begin()).unwrap());

    assert_eq!(failure.script.as_ref().map(|s| s.as_str()), Some("a.sql"));
    assert!(matches!(
        failure.cause,
        EngineError::Db(DbError::LedgerWriteFailed { .. })
    ));
    // Executed but never recorded: must not persist
    assert!(db.events().contains(&"exec:a.sql".to_string()));
    assert!(db.effects().is_empty());
    assert!(failure.report.applied.is_empty());
}

#[test]
fn test_commit_failure_is_reported_as_rollback() {
    let db = FakeDb::default();
    db.0.borrow_mut().fail_commit = true;
    let engine = MigrationEngine::new(abc(), FakeLedger::default());

    let failure = rolled_back(engine.run(db.begin()).unwrap());

    assert!(failure.script.is_none());
    assert!(matches!(
        failure.cause,
        EngineError::Db(DbError::CommitFailed(_))
    ));
    assert_eq!(failure.report.applied.len(), 3);
    assert!(db.ledger().is_empty());
}

#[test]
fn test_rollback_failure_is_fatal() {
    let db = FakeDb::default();
    {
        let mut state = db.0.borrow_mut();
        state.fail_script = Some("a.sql".to_string());
        state.fail_rollback = true;
    }
    let engine = MigrationEngine::new(abc(), FakeLedger::default());

    let err = engine.run(db.begin()).unwrap_err();

    match err {
        FatalError::RollbackFailed {
            script,
            cause,
            rollback,
        } => {
            assert_eq!(script.as_ref().map(|s| s.as_str()), Some("a.sql"));
            assert!(matches!(
                *cause,
                EngineError::Db(DbError::ScriptExecutionFailed { .. })
            ));
            assert!(matches!(rollback, DbError::RollbackFailed(_)));
        }
        other => panic!("expected RollbackFailed, got {other:?}"),
    }
}

#[test]
fn test_expired_deadline_stops_before_any_work() {
    let db = FakeDb::default();
    let engine = MigrationEngine::new(abc(), FakeLedger::default()).with_options(EngineOptions {
        deadline: Some(Duration::ZERO),
    });

    let failure = rolled_back(engine.run(db.begin()).unwrap());

    assert!(matches!(
        failure.cause,
        EngineError::DeadlineExceeded { .. }
    ));
    assert_eq!(db.events(), vec!["rollback"]);
}

#[test]
fn test_generous_deadline_does_not_interfere() {
    let db = FakeDb::default();
    let engine = MigrationEngine::new(abc(), FakeLedger::default()).with_options(EngineOptions {
        deadline: Some(Duration::from_secs(3600)),
    });

    let report = committed(engine.run(db.begin()).unwrap());
    assert_eq!(report.applied.len(), 3);
}

// ── Planning ───────────────────────────────────────────────────────────

#[test]
fn test_plan_classifies_scripts() {
    let db = FakeDb::default();
    db.seed_ledger("a.sql");
    db.seed_ledger("removed.sql");
    let engine = MigrationEngine::new(abc(), FakeLedger::default());

    let tx = db.begin();
    let status = engine.plan(&tx).unwrap();
    tx.rollback().unwrap();

    assert_eq!(status.applied_count(), 1);
    assert_eq!(status.pending_count(), 2);
    assert_eq!(
        status.pending().map(|n| n.as_str()).collect::<Vec<_>>(),
        vec!["b.sql", "c.sql"]
    );
    assert!(matches!(
        status.scripts[0].state,
        ScriptState::Applied { .. }
    ));
    assert_eq!(status.orphaned.len(), 1);
    assert_eq!(status.orphaned[0].script_name, "removed.sql");
    assert!(db.effects().is_empty());
}
