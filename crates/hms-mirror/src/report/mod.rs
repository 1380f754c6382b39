//! Rendering a conversion result for operators.
//!
//! Each database gets a Markdown report showing, per table and side, the
//! strategy, phase, issues, errors and generated SQL, plus one execute and
//! one cleanup script per side that has statements.

use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::core::{ConversionResult, DBMirror, Environment, EnvironmentTable, SqlPair};
use crate::error::Result;
use crate::hive::statement::SKIPPED_DESC;

/// Sides that get scripts. SHADOW and TRANSFER statements run on them.
const SCRIPT_SIDES: [Environment; 2] = [Environment::Left, Environment::Right];

/// Markdown report for one database.
pub fn database_report(result: &ConversionResult, db: &DBMirror) -> String {
    let mut out = String::new();
    out.push_str(&format!("# {}\n\n", db.name));
    out.push_str(&format!("- Job: `{}`\n", result.key));
    out.push_str(&format!("- Strategy: `{}`\n", result.strategy));
    out.push_str(&format!("- Target database: `{}`\n", db.target_name));
    out.push_str(&format!("- Config hash: `{}`\n", result.config_hash));
    out.push_str(&format!("- Started: {}\n", result.started_at.to_rfc3339()));
    if let Some(completed) = result.completed_at {
        out.push_str(&format!("- Completed: {}\n", completed.to_rfc3339()));
    }
    if result.cancelled {
        out.push_str("- **Cancelled**: tables that did not finish keep their last phase\n");
    }
    out.push('\n');

    if let Some(failure) = &result.validation {
        out.push_str("## Validation\n\n");
        out.push_str(&format!("Return code: `{}`\n\n", failure.return_code()));
        for code in &failure.codes {
            out.push_str(&format!("- `{:?}`: {}\n", code, code.message()));
        }
        out.push('\n');
    }

    out.push_str("## Phase Summary\n\n");
    out.push_str("| Phase | Tables |\n");
    out.push_str("|---|---:|\n");
    for (state, count) in db.phase_summary() {
        out.push_str(&format!("| {} | {} |\n", state, count));
    }
    out.push('\n');

    let database_sql = SCRIPT_SIDES
        .iter()
        .filter(|env| !db.sql_for(**env).is_empty() || db.issues.contains_key(*env))
        .collect::<Vec<_>>();
    if !database_sql.is_empty() {
        out.push_str("## Database\n\n");
        for env in database_sql {
            out.push_str(&format!("### {}\n\n", env));
            if let Some(issues) = db.issues.get(env) {
                for issue in issues {
                    out.push_str(&format!("- {}\n", issue));
                }
                out.push('\n');
            }
            push_sql(&mut out, db.sql_for(*env));
        }
    }

    out.push_str("## Tables\n\n");
    out.push_str("| Table | Strategy | Phase | Progress | Issues | Errors |\n");
    out.push_str("|---|---|---|---:|---:|---:|\n");
    for table in db.tables.values() {
        let (issues, errors) = table
            .environments
            .iter()
            .fold((0, 0), |(i, e), (_, t)| (i + t.issues.len(), e + t.errors.len()));
        out.push_str(&format!(
            "| {} | {} | {} | {}/{} | {} | {} |\n",
            table.name,
            table.strategy.map(|s| s.to_string()).unwrap_or_else(|| "-".into()),
            table.phase_state,
            table.current_phase,
            table.total_phase_count,
            issues,
            errors
        ));
    }
    out.push('\n');

    for table in db.tables.values() {
        out.push_str(&format!("### {}\n\n", table.name));
        for (env, side) in table.environments.iter() {
            if side.sql.is_empty()
                && side.cleanup_sql.is_empty()
                && side.issues.is_empty()
                && side.errors.is_empty()
            {
                continue;
            }
            out.push_str(&format!("#### {}\n\n", env));
            push_side(&mut out, side);
        }
    }
    out
}

fn push_side(out: &mut String, side: &EnvironmentTable) {
    if !side.errors.is_empty() {
        out.push_str("Errors:\n\n");
        for error in &side.errors {
            out.push_str(&format!("- {}\n", error));
        }
        out.push('\n');
    }
    if !side.issues.is_empty() {
        out.push_str("Issues:\n\n");
        for issue in &side.issues {
            out.push_str(&format!("- {}\n", issue));
        }
        out.push('\n');
    }
    push_sql(out, &side.sql);
    if !side.cleanup_sql.is_empty() {
        out.push_str("Cleanup:\n\n");
        push_sql(out, &side.cleanup_sql);
    }
}

fn push_sql(out: &mut String, sql: &[SqlPair]) {
    if sql.is_empty() {
        return;
    }
    out.push_str("```sql\n");
    for pair in sql {
        out.push_str(&render_statement(pair));
    }
    out.push_str("```\n\n");
}

/// One statement as a script fragment: the description as a comment, then
/// the statement terminated by `;`.
fn render_statement(pair: &SqlPair) -> String {
    if pair.description == SKIPPED_DESC {
        return format!("-- {}\n{}\n", pair.description, pair.action);
    }
    format!("-- {}\n{};\n", pair.description, pair.action.trim_end())
}

/// Statements to run on `env` for the whole database: database DDL first,
/// then every table in name order.
pub fn execute_script(db: &DBMirror, env: Environment) -> Option<String> {
    let mut statements: Vec<&SqlPair> = db.sql_for(env).iter().collect();
    for table in db.tables.values() {
        if let Some(side) = table.env(env) {
            statements.extend(side.sql.iter().filter(|p| p.description != SKIPPED_DESC));
        }
    }
    script(&statements)
}

/// Statements removing the working tables on `env`.
pub fn cleanup_script(db: &DBMirror, env: Environment) -> Option<String> {
    let statements: Vec<&SqlPair> = db
        .tables
        .values()
        .filter_map(|table| table.env(env))
        .flat_map(|side| side.cleanup_sql.iter())
        .collect();
    script(&statements)
}

fn script(statements: &[&SqlPair]) -> Option<String> {
    if statements.is_empty() {
        return None;
    }
    Some(statements.iter().map(|p| render_statement(p)).collect())
}

/// Write every report and script of `result` into `dir`.
pub fn write_reports(result: &ConversionResult, dir: &Path) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(dir)?;
    let mut written = Vec::new();
    for db in result.databases.values() {
        let path = dir.join(format!("{}_hms-mirror.md", db.name));
        fs::write(&path, database_report(result, db))?;
        written.push(path);

        for env in SCRIPT_SIDES {
            if let Some(sql) = execute_script(db, env) {
                let path = dir.join(format!("{}_{}_execute.sql", db.name, env));
                fs::write(&path, sql)?;
                written.push(path);
            }
            if let Some(sql) = cleanup_script(db, env) {
                let path = dir.join(format!("{}_{}_CleanUp_execute.sql", db.name, env));
                fs::write(&path, sql)?;
                written.push(path);
            }
        }
    }
    info!("Wrote {} report files to {:?}", written.len(), dir);
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, DataStrategy};
    use crate::core::{EnvironmentTable, PhaseState, TableMirror};
    use crate::hive::statement as hql;

    fn result() -> ConversionResult {
        let config = Config {
            data_strategy: DataStrategy::Sql,
            ..Default::default()
        };
        let mut result = ConversionResult::new(&config);
        let mut db = DBMirror::new("db", "db");
        db.add_sql(Environment::Right, hql::CREATE_DATABASE_DESC, hql::create_database("db"));

        let mut ok = TableMirror::new("t1", EnvironmentTable::named("t1"), EnvironmentTable::named("t1"));
        ok.strategy = Some(DataStrategy::Sql);
        ok.phase_state = PhaseState::CalculatedSql;
        let right = ok.env_mut(Environment::Right);
        right.add_sql(hql::USE_DESC, hql::use_db("db"));
        right.add_sql(hql::MOVE_DATA_DESC, hql::insert_overwrite("hms_mirror_shadow_t1", "t1", &[]));
        right.add_cleanup_sql(hql::DROP_SHADOW_TABLE_DESC, hql::drop_table("hms_mirror_shadow_t1"));

        let mut failed = TableMirror::new("t2", EnvironmentTable::named("t2"), EnvironmentTable::named("t2"));
        failed.phase_state = PhaseState::Error;
        let right = failed.env_mut(Environment::Right);
        right.add_sql(hql::SKIPPED_DESC, hql::skipped("t2"));
        right.add_error("Schema exists already.");

        db.tables.insert("t1".into(), ok);
        db.tables.insert("t2".into(), failed);
        result.databases.insert("db".into(), db);
        result
    }

    #[test]
    fn test_execute_script_orders_database_first() {
        let result = result();
        let script = execute_script(&result.databases["db"], Environment::Right).unwrap();
        assert_eq!(
            script,
            "-- Create Database\nCREATE DATABASE IF NOT EXISTS db;\n\
             -- Selecting DB\nUSE db;\n\
             -- Moving data to new table\nFROM hms_mirror_shadow_t1 INSERT OVERWRITE TABLE t1 SELECT *;\n"
        );
        assert!(execute_script(&result.databases["db"], Environment::Left).is_none());
    }

    #[test]
    fn test_cleanup_script() {
        let result = result();
        let script = cleanup_script(&result.databases["db"], Environment::Right).unwrap();
        assert!(script.ends_with("DROP TABLE IF EXISTS hms_mirror_shadow_t1;\n"));
    }

    #[test]
    fn test_report_shows_errors_and_skipped_sql() {
        let result = result();
        let report = database_report(&result, &result.databases["db"]);
        assert!(report.starts_with("# db\n"));
        assert!(report.contains("| t2 | - | ERROR | 0/0 | 0 | 1 |"));
        assert!(report.contains("- Schema exists already."));
        assert!(report.contains("-- Skipped\n-- t2 skipped\n"));
    }

    #[test]
    fn test_write_reports() {
        let dir = tempfile::tempdir().unwrap();
        let written = write_reports(&result(), dir.path()).unwrap();
        let names: Vec<_> = written
            .iter()
            .filter_map(|p| p.file_name().and_then(|n| n.to_str()).map(str::to_string))
            .collect();
        assert_eq!(
            names,
            vec![
                "db_hms-mirror.md",
                "db_RIGHT_execute.sql",
                "db_RIGHT_CleanUp_execute.sql"
            ]
        );
    }
}
