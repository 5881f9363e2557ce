use super::model::Track;

/// Tracks sharing one category label, as indices into the playlist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryGroup {
    pub name: String,
    pub indices: Vec<usize>,
}

/// Group playlist indices by category.
///
/// Categories named in `order` come first, in that order. Any other category
/// follows in the order it first appears in `tracks`. Tracks keep their
/// playlist order inside a group, and categories without tracks are omitted.
pub fn group_by_category(tracks: &[Track], order: &[String]) -> Vec<CategoryGroup> {
    let mut groups: Vec<CategoryGroup> = order
        .iter()
        .map(|name| CategoryGroup {
            name: name.clone(),
            indices: Vec::new(),
        })
        .collect();

    for (i, track) in tracks.iter().enumerate() {
        match groups.iter_mut().find(|g| g.name == track.category) {
            Some(group) => group.indices.push(i),
            None => groups.push(CategoryGroup {
                name: track.category.clone(),
                indices: vec![i],
            }),
        }
    }

    groups.retain(|g| !g.indices.is_empty());
    groups
}
