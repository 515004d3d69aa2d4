use crate::profile::{Drinking, FoodPreference, Smoking, UserProfile};

fn food_compatibility(a: FoodPreference, b: FoodPreference) -> f64 {
    use FoodPreference::*;
    if a == b {
        return 1.0;
    }
    match (a, b) {
        (Vegetarian, Vegan)
        | (Vegan, Vegetarian)
        | (Vegetarian, Jain)
        | (Jain, Vegetarian)
        | (Vegan, Jain)
        | (Jain, Vegan)
        | (NonVegetarian, Eggetarian)
        | (Eggetarian, NonVegetarian) => 0.7,
        _ => 0.3,
    }
}

fn smoking_compatibility(a: Smoking, b: Smoking) -> f64 {
    use Smoking::*;
    if a == b {
        return 1.0;
    }
    let pair = if (a as u8) <= (b as u8) { (a, b) } else { (b, a) };
    match pair {
        (Never, TryingToQuit) => 0.8,
        (Never, Socially) => 0.3,
        (Never, Regularly) => 0.1,
        (Socially, Regularly) => 0.7,
        _ => 0.5,
    }
}

fn drinking_compatibility(a: Drinking, b: Drinking) -> f64 {
    use Drinking::*;
    if a == b {
        return 1.0;
    }
    let pair = if (a as u8) <= (b as u8) { (a, b) } else { (b, a) };
    match pair {
        (Never, Occasionally) => 0.7,
        (Never, Socially) => 0.4,
        (Never, Regularly) => 0.2,
        (Occasionally, Socially) => 0.9,
        (Socially, Regularly) => 0.8,
        _ => 0.5,
    }
}

/// Mean over the lifestyle attributes both users filled in; 0.5 when none overlap.
pub fn lifestyle_compatibility(user: &UserProfile, candidate: &UserProfile) -> f64 {
    let pairs = [
        user.food_preference
            .zip(candidate.food_preference)
            .map(|(a, b)| food_compatibility(a, b)),
        user.smoking
            .zip(candidate.smoking)
            .map(|(a, b)| smoking_compatibility(a, b)),
        user.drinking
            .zip(candidate.drinking)
            .map(|(a, b)| drinking_compatibility(a, b)),
    ];

    let present: Vec<f64> = pairs.into_iter().flatten().collect();
    if present.is_empty() {
        return 0.5;
    }
    present.iter().sum::<f64>() / present.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::fixtures::profile;

    #[test]
    fn matrices_are_symmetric() {
        assert_eq!(
            smoking_compatibility(Smoking::Regularly, Smoking::Never),
            smoking_compatibility(Smoking::Never, Smoking::Regularly)
        );
        assert_eq!(
            drinking_compatibility(Drinking::Socially, Drinking::Occasionally),
            0.9
        );
        assert_eq!(
            smoking_compatibility(Smoking::Socially, Smoking::TryingToQuit),
            0.5
        );
    }

    #[test]
    fn averages_present_pairs() {
        let mut a = profile("A");
        let mut b = profile("B");
        a.food_preference = Some(FoodPreference::Vegan);
        b.food_preference = Some(FoodPreference::Jain);
        a.smoking = Some(Smoking::Never);
        b.smoking = Some(Smoking::Never);
        a.drinking = None;

        let score = lifestyle_compatibility(&a, &b);
        assert!((score - 0.85).abs() < 1e-9, "got {score}");
    }

    #[test]
    fn neutral_when_nothing_comparable() {
        let mut a = profile("A");
        a.food_preference = None;
        a.smoking = None;
        a.drinking = None;
        assert_eq!(lifestyle_compatibility(&a, &profile("B")), 0.5);
    }
}
