use tracing::warn;

/// Navigate into a nested `toml::Value` by path segments.
pub(crate) fn get_nested<'a>(val: &'a toml::Value, path: &[&str]) -> Option<&'a toml::Value> {
    let mut current = val;
    for segment in path {
        current = current.as_table()?.get(*segment)?;
    }
    Some(current)
}

/// Set a value at a nested path, creating intermediate tables as needed.
pub(crate) fn set_nested(val: &mut toml::Value, path: &[&str], new_val: toml::Value) {
    let Some((leaf, parents)) = path.split_last() else {
        return;
    };

    let mut current = val;
    for segment in parents {
        let Some(table) = current.as_table_mut() else {
            warn!("set_nested: '{segment}' is not inside a table; skipping");
            return;
        };
        current = table
            .entry((*segment).to_owned())
            .or_insert_with(|| toml::Value::Table(toml::map::Map::new()));
    }

    if let Some(table) = current.as_table_mut() {
        table.insert((*leaf).to_owned(), new_val);
    }
}

/// Remove a value at a nested path.
pub(crate) fn remove_nested(val: &mut toml::Value, path: &[&str]) {
    let Some((leaf, parents)) = path.split_last() else {
        return;
    };

    let mut current = val;
    for segment in parents {
        let Some(next) = current.as_table_mut().and_then(|t| t.get_mut(*segment)) else {
            return;
        };
        current = next;
    }

    if let Some(table) = current.as_table_mut() {
        table.remove(*leaf);
    }
}
