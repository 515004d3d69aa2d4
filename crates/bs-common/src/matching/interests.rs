use std::collections::BTreeSet;

/// Interest categories and the keywords that place a tag in them.
const CATEGORIES: &[(&str, &[&str])] = &[
    (
        "technology",
        &[
            "coding", "programming", "ai", "ml", "robotics", "tech", "gaming", "software",
            "hardware", "electronics", "web", "app", "blockchain", "crypto",
        ],
    ),
    (
        "sports",
        &[
            "football", "cricket", "basketball", "tennis", "badminton", "swimming", "gym",
            "fitness", "running", "cycling", "yoga", "volleyball", "chess",
        ],
    ),
    (
        "arts",
        &[
            "music", "art", "painting", "drawing", "photography", "dance", "theater", "writing",
            "poetry", "singing", "guitar", "piano", "design",
        ],
    ),
    (
        "academics",
        &[
            "research", "science", "mathematics", "physics", "chemistry", "biology",
            "literature", "history", "philosophy", "economics",
        ],
    ),
    (
        "social",
        &[
            "volunteering", "community", "networking", "leadership", "debate", "mun",
            "entrepreneurship", "startup", "business",
        ],
    ),
    (
        "travel",
        &[
            "travel", "trekking", "hiking", "camping", "adventure", "backpacking",
            "exploration",
        ],
    ),
    (
        "food",
        &["cooking", "baking", "food", "restaurants", "cuisine", "culinary"],
    ),
    (
        "entertainment",
        &[
            "movies", "tv", "netflix", "anime", "comics", "books", "reading", "podcasts",
            "streaming",
        ],
    ),
];

pub const CREATIVE_KEYWORDS: &[&str] = &["art", "music", "creative"];
pub const TECH_KEYWORDS: &[&str] = &["tech", "coding", "programming"];
pub const SOCIAL_KEYWORDS: &[&str] = &["party", "social", "friends"];

/// True when any word of `interest` equals one of `keywords`, or starts with a
/// keyword of three or more letters (`arts`, `website`).
///
/// Word matching keeps `ai` out of `painting` and `art` out of `party`.
pub fn mentions_any(interest: &str, keywords: &[&str]) -> bool {
    let lowered = interest.to_lowercase();
    lowered
        .split(|c: char| !c.is_alphanumeric())
        .filter(|word| !word.is_empty())
        .any(|word| {
            keywords
                .iter()
                .any(|kw| word == *kw || (kw.len() >= 3 && word.starts_with(kw)))
        })
}

pub fn categories_of<'a, I>(interests: I) -> BTreeSet<&'static str>
where
    I: IntoIterator<Item = &'a String>,
{
    let mut out = BTreeSet::new();
    for interest in interests {
        for (category, keywords) in CATEGORIES {
            if mentions_any(interest, keywords) {
                out.insert(*category);
            }
        }
    }
    out
}

/// Interests shared by both users, in the requester's order.
pub fn common_interests(user: &[String], candidate: &[String]) -> Vec<String> {
    let theirs: BTreeSet<String> = candidate.iter().map(|i| i.to_lowercase()).collect();
    let mut seen = BTreeSet::new();
    user.iter()
        .map(|i| i.to_lowercase())
        .filter(|i| theirs.contains(i) && seen.insert(i.clone()))
        .collect()
}

fn jaccard<T: Ord>(a: &BTreeSet<T>, b: &BTreeSet<T>) -> f64 {
    let union = a.union(b).count();
    if union == 0 {
        return 0.0;
    }
    a.intersection(b).count() as f64 / union as f64
}

/// `0.6 * jaccard(tags) + 0.4 * jaccard(categories)`; zero when either side is empty.
pub fn interest_similarity(user: &[String], candidate: &[String]) -> f64 {
    if user.is_empty() || candidate.is_empty() {
        return 0.0;
    }

    let a: BTreeSet<String> = user.iter().map(|i| i.to_lowercase()).collect();
    let b: BTreeSet<String> = candidate.iter().map(|i| i.to_lowercase()).collect();
    let tag_overlap = jaccard(&a, &b);

    let cats_a = categories_of(user);
    let cats_b = categories_of(candidate);
    let category_overlap = if cats_a.is_empty() || cats_b.is_empty() {
        0.0
    } else {
        jaccard(&cats_a, &cats_b)
    };

    (0.6 * tag_overlap + 0.4 * category_overlap).clamp(0.0, 1.0)
}

/// Share of the candidate's interests the requester does not already have.
pub fn novelty(user: &[String], candidate: &[String]) -> f64 {
    if user.is_empty() || candidate.is_empty() {
        return 0.5;
    }
    let mine: BTreeSet<String> = user.iter().map(|i| i.to_lowercase()).collect();
    let theirs: BTreeSet<String> = candidate.iter().map(|i| i.to_lowercase()).collect();
    theirs.difference(&mine).count() as f64 / theirs.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn identical_interests_score_one() {
        let a = tags(&["coding", "music"]);
        assert!((interest_similarity(&a, &a) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn empty_side_scores_zero() {
        assert_eq!(interest_similarity(&[], &tags(&["coding"])), 0.0);
    }

    #[test]
    fn category_overlap_counts_without_shared_tags() {
        let a = tags(&["football"]);
        let b = tags(&["cricket"]);
        let score = interest_similarity(&a, &b);
        assert!((score - 0.4).abs() < 1e-9, "got {score}");
    }

    #[test]
    fn short_keywords_match_whole_words_only() {
        assert!(!mentions_any("painting", &["ai"]));
        assert!(!mentions_any("party", &["art"]));
        assert!(mentions_any("martial arts", &["art"]));
        assert!(mentions_any("ai research", &["ai"]));
        assert!(mentions_any("web development", &["web"]));
        assert!(mentions_any("competitive programming", &["programming"]));
    }

    #[test]
    fn common_interests_are_case_insensitive() {
        let common = common_interests(&tags(&["Coding", "music"]), &tags(&["coding", "dance"]));
        assert_eq!(common, vec!["coding".to_string()]);
    }

    #[test]
    fn novelty_measures_unfamiliar_share() {
        let user = tags(&["coding", "music"]);
        let candidate = tags(&["coding", "dance", "chess", "cooking"]);
        assert!((novelty(&user, &candidate) - 0.75).abs() < 1e-9);
        assert_eq!(novelty(&[], &candidate), 0.5);
    }
}
