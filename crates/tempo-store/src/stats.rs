use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use tempo_core::dates::day_range;
use tempo_core::ids::PlaylistId;

use crate::database::Database;
use crate::error::StoreError;
use crate::row_helpers;

/// How many times a playlist was completed inside a date range.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PlaylistCompletionCount {
    pub playlist_id: PlaylistId,
    pub name: String,
    pub count: i64,
}

pub struct StatsRepo {
    db: Database,
}

impl StatsRepo {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Completion counts per playlist over [start, end], end inclusive.
    /// Playlists with zero completions in the range are excluded, and
    /// results come back most-completed first.
    #[instrument(skip(self), fields(start = %start, end = %end))]
    pub fn completion_counts(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<PlaylistCompletionCount>, StoreError> {
        let (range_start, _) = day_range(start);
        let (_, range_end) = day_range(end);

        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT p.id, p.name, COUNT(pc.id) AS completions
                 FROM playlists p
                 JOIN playlist_completions pc ON pc.playlist_id = p.id
                 WHERE pc.date >= ?1 AND pc.date < ?2
                 GROUP BY p.id, p.name
                 HAVING completions > 0
                 ORDER BY completions DESC, p.name ASC",
            )?;
            let mut rows = stmt.query(rusqlite::params![range_start, range_end])?;
            let mut results = Vec::new();
            while let Some(row) = rows.next()? {
                results.push(PlaylistCompletionCount {
                    playlist_id: PlaylistId::from_raw(row_helpers::get::<String>(
                        row,
                        0,
                        "playlists",
                        "id",
                    )?),
                    name: row_helpers::get(row, 1, "playlists", "name")?,
                    count: row_helpers::get(row, 2, "playlist_completions", "count")?,
                });
            }
            Ok(results)
        })
    }
}
