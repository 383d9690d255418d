use crate::model::Category;

/// Projects accumulated categories through a free-text filter.
///
/// - An empty filter returns the list unchanged.
/// - Otherwise only names containing the filter (case-insensitively) remain.
/// - Unless one name equals the filter exactly (again case-insensitively),
///   a synthetic search category for the filter text is placed first.
pub fn project_categories(categories: &[Category], filter: &str) -> Vec<Category> {
    if filter.is_empty() {
        return categories.to_vec();
    }

    let needle = filter.to_lowercase();
    let mut exact = false;
    let matches: Vec<Category> = categories
        .iter()
        .filter(|category| {
            let name = category.name.to_lowercase();
            exact |= name == needle;
            name.contains(&needle)
        })
        .cloned()
        .collect();

    if exact {
        return matches;
    }

    let mut projected = Vec::with_capacity(matches.len() + 1);
    projected.push(Category::search(filter));
    projected.extend(matches);
    projected
}
