use anyhow::{Context, Result};
use chrono::Utc;
use rusqlite::{params, Connection};
use crate::data::types::{Side, Snapshot};
use crate::engine::RunOutput;
use crate::monitoring::stats::RunStats;

/// SQLite store holding raw price snapshots and per-run results.
pub struct RunDatabase {
    conn: Connection,
}

/// Identifier results are stored under.
pub fn run_id(market_id: &str, analysis_start: i64, analysis_end: i64) -> String {
    format!("{}:{}-{}", market_id, analysis_start, analysis_end)
}

impl RunDatabase {
    pub fn new(db_path: &str) -> Result<Self> {
        let conn = Connection::open(db_path)
            .with_context(|| format!("Failed to open database: {}", db_path))?;
        Self::init(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS price_snapshots (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                market_id TEXT NOT NULL,
                timestamp INTEGER NOT NULL,
                side TEXT NOT NULL,
                mid_price REAL NOT NULL,
                last_price REAL NOT NULL,
                is_tradable INTEGER NOT NULL DEFAULT 1
            );

            CREATE TABLE IF NOT EXISTS runs (
                run_id TEXT PRIMARY KEY,
                market_id TEXT NOT NULL,
                analysis_start INTEGER NOT NULL,
                analysis_end INTEGER NOT NULL,
                stats_json TEXT NOT NULL,
                created_at TIMESTAMP NOT NULL
            );

            CREATE TABLE IF NOT EXISTS windows (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                run_id TEXT NOT NULL,
                window_index INTEGER NOT NULL,
                start_time INTEGER NOT NULL,
                end_time INTEGER NOT NULL,
                duration REAL NOT NULL,
                entry_combined_price REAL NOT NULL,
                min_combined_price REAL NOT NULL,
                exit_combined_price REAL NOT NULL,
                tick_count INTEGER NOT NULL,
                FOREIGN KEY(run_id) REFERENCES runs(run_id)
            );

            CREATE TABLE IF NOT EXISTS trades (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                run_id TEXT NOT NULL,
                window_index INTEGER NOT NULL,
                result TEXT NOT NULL,
                raw_edge REAL NOT NULL,
                profit REAL NOT NULL,
                fees REAL NOT NULL,
                FOREIGN KEY(run_id) REFERENCES runs(run_id)
            );

            CREATE INDEX IF NOT EXISTS idx_snapshots_market_ts ON price_snapshots(market_id, timestamp);
            CREATE INDEX IF NOT EXISTS idx_windows_run_id ON windows(run_id);
            CREATE INDEX IF NOT EXISTS idx_trades_run_id ON trades(run_id);
            "#,
        )?;

        Ok(Self { conn })
    }

    pub fn insert_snapshots(&mut self, snapshots: &[Snapshot]) -> Result<()> {
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO price_snapshots (market_id, timestamp, side, mid_price, last_price, is_tradable)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )?;
            for s in snapshots {
                stmt.execute(params![
                    s.market_id,
                    s.timestamp,
                    s.side.as_str(),
                    s.mid_price,
                    s.last_price,
                    s.is_tradable,
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    /// Markets that have at least one snapshot
    pub fn list_markets(&self) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT DISTINCT market_id FROM price_snapshots ORDER BY market_id")?;
        let markets = stmt.query_map([], |row| row.get(0))?;
        markets.collect::<Result<Vec<_>, _>>().map_err(|e| e.into())
    }

    /// Snapshots of `market_id` with `start <= timestamp <= end`, in timestamp order.
    pub fn load_snapshots(&self, market_id: &str, start: i64, end: i64) -> Result<Vec<Snapshot>> {
        let mut stmt = self.conn.prepare(
            "SELECT market_id, timestamp, side, mid_price, last_price, is_tradable
             FROM price_snapshots
             WHERE market_id = ?1 AND timestamp >= ?2 AND timestamp <= ?3
             ORDER BY timestamp, id",
        )?;

        let rows = stmt.query_map(params![market_id, start, end], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, f64>(3)?,
                row.get::<_, f64>(4)?,
                row.get::<_, bool>(5)?,
            ))
        })?;

        let mut snapshots = Vec::new();
        for row in rows {
            let (market_id, timestamp, side, mid_price, last_price, is_tradable) = row?;
            let side: Side = side
                .parse()
                .map_err(|e| anyhow::anyhow!("Bad snapshot at {}: {}", timestamp, e))?;

            snapshots.push(Snapshot {
                market_id,
                timestamp,
                side,
                mid_price,
                last_price,
                is_tradable,
            });
        }

        Ok(snapshots)
    }

    /// Store a run's windows, trades and stats, replacing any earlier copy of the run.
    pub fn save_run(&mut self, run_id: &str, market_id: &str, output: &RunOutput) -> Result<()> {
        let stats_json = serde_json::to_string(&output.stats)?;
        let tx = self.conn.transaction()?;

        tx.execute("DELETE FROM trades WHERE run_id = ?1", params![run_id])?;
        tx.execute("DELETE FROM windows WHERE run_id = ?1", params![run_id])?;
        tx.execute(
            "INSERT OR REPLACE INTO runs (run_id, market_id, analysis_start, analysis_end, stats_json, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                run_id,
                market_id,
                output.stats.analysis_start,
                output.stats.analysis_end,
                stats_json,
                Utc::now().to_rfc3339(),
            ],
        )?;

        {
            let mut stmt = tx.prepare(
                "INSERT INTO windows (run_id, window_index, start_time, end_time, duration,
                    entry_combined_price, min_combined_price, exit_combined_price, tick_count)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            )?;
            for (i, w) in output.windows.iter().enumerate() {
                stmt.execute(params![
                    run_id,
                    i as i64,
                    w.start_time,
                    w.end_time,
                    w.duration,
                    w.entry_combined_price,
                    w.min_combined_price,
                    w.exit_combined_price,
                    w.tick_count as i64,
                ])?;
            }

            let mut stmt = tx.prepare(
                "INSERT INTO trades (run_id, window_index, result, raw_edge, profit, fees)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )?;
            for t in &output.trades {
                stmt.execute(params![
                    run_id,
                    t.window_ref as i64,
                    t.result.as_str(),
                    t.raw_edge,
                    t.profit,
                    t.fees,
                ])?;
            }
        }

        tx.commit()?;
        Ok(())
    }

    pub fn load_run_stats(&self, run_id: &str) -> Result<Option<RunStats>> {
        let mut stmt = self
            .conn
            .prepare("SELECT stats_json FROM runs WHERE run_id = ?1")?;
        let mut rows = stmt.query(params![run_id])?;

        match rows.next()? {
            Some(row) => {
                let json: String = row.get(0)?;
                let stats: RunStats = serde_json::from_str(&json)
                    .with_context(|| format!("Corrupt stats for run {}", run_id))?;
                Ok(Some(stats))
            }
            None => Ok(None),
        }
    }

    pub fn count_windows(&self, run_id: &str) -> Result<usize> {
        let count: usize = self.conn.query_row(
            "SELECT COUNT(*) FROM windows WHERE run_id = ?1",
            params![run_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    pub fn count_trades(&self, run_id: &str, result: &str) -> Result<usize> {
        let count: usize = self.conn.query_row(
            "SELECT COUNT(*) FROM trades WHERE run_id = ?1 AND result = ?2",
            params![run_id, result],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::engine::detect_and_simulate;

    fn seed(db: &mut RunDatabase) {
        let mut snapshots = Vec::new();
        for i in 0..12 {
            let ts = 1_000 + 5 * i;
            let mid = if (2..=7).contains(&i) { 0.47 } else { 0.52 };
            snapshots.push(Snapshot::new("m1", ts, Side::Yes, mid));
            snapshots.push(Snapshot::new("m1", ts, Side::No, mid));
        }
        snapshots.push(Snapshot::new("m2", 1_000, Side::Yes, 0.5));
        db.insert_snapshots(&snapshots).unwrap();
    }

    #[test]
    fn test_snapshot_round_trip_and_range() {
        let mut db = RunDatabase::open_in_memory().unwrap();
        seed(&mut db);

        assert_eq!(db.list_markets().unwrap(), vec!["m1".to_string(), "m2".to_string()]);

        let loaded = db.load_snapshots("m1", 1_010, 1_020).unwrap();
        assert_eq!(loaded.len(), 6);
        assert!(loaded.iter().all(|s| s.market_id == "m1"));
        assert_eq!(loaded[0].timestamp, 1_010);
        assert_eq!(loaded[0].side, Side::Yes);
        assert!(loaded[0].is_tradable);
    }

    #[test]
    fn test_save_run_replaces_previous_copy() {
        let mut db = RunDatabase::open_in_memory().unwrap();
        seed(&mut db);

        let snapshots = db.load_snapshots("m1", 995, 1_065).unwrap();
        let output = detect_and_simulate(&snapshots, 1_000, 1_060, 100.0, &EngineConfig::default()).unwrap();
        assert_eq!(output.windows.len(), 1);

        let id = run_id("m1", 1_000, 1_060);
        db.save_run(&id, "m1", &output).unwrap();
        db.save_run(&id, "m1", &output).unwrap();

        assert_eq!(db.count_windows(&id).unwrap(), 1);
        assert_eq!(db.count_trades(&id, "completed").unwrap(), 1);
        assert_eq!(db.count_trades(&id, "failed").unwrap(), 0);
        assert_eq!(db.load_run_stats(&id).unwrap(), Some(output.stats));
        assert_eq!(db.load_run_stats("missing").unwrap(), None);
    }
}
