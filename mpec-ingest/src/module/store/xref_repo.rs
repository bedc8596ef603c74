///! `cross_references` table

use mpec_common::CrossReference;
use rusqlite::{Connection, params};

use super::{bool_flag, parse_label};
use crate::error::StoreResult;

pub fn insert(conn: &Connection, xref: &CrossReference) -> StoreResult<()> {
    conn.execute(
        "INSERT INTO cross_references (
            bulletin_id, from_designation, to_designation, relation, author, is_retracted
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
        params![
            xref.bulletin_id,
            xref.from_designation,
            xref.to_designation,
            xref.relation.as_str(),
            xref.author,
            xref.is_retracted,
        ],
    )?;
    Ok(())
}

/// Cross references announced by one bulletin, in insertion order.
pub fn for_bulletin(conn: &Connection, bulletin_id: &str) -> StoreResult<Vec<CrossReference>> {
    let mut stmt = conn.prepare(
        "SELECT bulletin_id, from_designation, to_designation, relation, author, is_retracted
         FROM cross_references
         WHERE bulletin_id = ?1
         ORDER BY rowid;",
    )?;
    let rows = stmt
        .query_map([bulletin_id], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, i64>(5)?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    rows.into_iter()
        .map(|(bulletin_id, from_designation, to_designation, relation, author, retracted)| {
            Ok(CrossReference {
                bulletin_id,
                from_designation,
                to_designation,
                relation: parse_label(&relation)?,
                author,
                is_retracted: bool_flag(retracted),
            })
        })
        .collect()
}
