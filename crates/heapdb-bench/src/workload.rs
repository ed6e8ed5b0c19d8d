//! Workload generators shared by the benchmarks.

use heapdb_common::{ColumnType, RecordPos};
use heapdb_storage::{Record, StorageResult, TableSchema};
use rand::distributions::Alphanumeric;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

/// Width of the `name` column of [`people_schema`].
pub const NAME_WIDTH: usize = 16;

/// Schema `people(id INT, name VARCHAR(16), score FLOAT)` keyed on `id`.
pub fn people_schema() -> StorageResult<TableSchema> {
    TableSchema::new(
        vec!["id".into(), "name".into(), "score".into()],
        people_types()?.to_vec(),
        "id",
    )
}

/// Column types of [`people_schema`].
pub fn people_types() -> StorageResult<[ColumnType; 3]> {
    Ok([
        ColumnType::int(),
        ColumnType::varchar(NAME_WIDTH)?,
        ColumnType::float(),
    ])
}

/// Generates random alphanumeric text.
pub fn random_string(rng: &mut StdRng, len: usize) -> String {
    rng.sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

/// Rows of `people` as text, ids `1..=count` in shuffled order.
pub fn people_rows(count: usize) -> Vec<[String; 3]> {
    let mut rng = StdRng::seed_from_u64(42);
    let mut ids: Vec<i32> = (1..=count as i32).collect();
    ids.shuffle(&mut rng);
    ids.into_iter()
        .map(|id| {
            let name = random_string(&mut rng, 10);
            let score: f32 = rng.gen_range(0.0..100.0);
            [id.to_string(), name, format!("{:.2}", score)]
        })
        .collect()
}

/// Encoded `people` records.
pub fn people_records(count: usize) -> StorageResult<Vec<Record>> {
    let types = people_types()?;
    people_rows(count)
        .iter()
        .map(|row| Record::from_strings(row, &types))
        .collect()
}

/// Distinct shuffled INT keys paired with positions.
pub fn int_entries(count: usize) -> Vec<(i32, RecordPos)> {
    let mut rng = StdRng::seed_from_u64(7);
    let mut keys: Vec<i32> = (0..count as i32).map(|k| k * 3).collect();
    keys.shuffle(&mut rng);
    keys.into_iter()
        .enumerate()
        .map(|(i, k)| (k, RecordPos::new(i as u64)))
        .collect()
}

/// Random lookup keys, about half of which hit [`int_entries`].
pub fn lookup_keys(count: usize, entries: usize) -> Vec<i32> {
    let mut rng = StdRng::seed_from_u64(11);
    (0..count)
        .map(|_| rng.gen_range(0..(entries as i32) * 3))
        .collect()
}
