//! Buyer-intent query battery generated from a brand profile.
//!
//! The battery walks the profile in a fixed order: industry templates,
//! location variants, keyword variants (with location and industry
//! combinations), multi-keyword queries, then direct brand queries. Platforms
//! only ever see the first `queries_per_platform` entries, so the ordering is
//! part of the contract.

use brandlens_core::BrandProfile;

pub fn generate_queries(profile: &BrandProfile) -> Vec<String> {
    let industry = &profile.industry;
    let brand = &profile.brand_name;
    // "Global" is the UI's whole-world choice and carries no locality signal.
    let location = profile
        .location
        .as_deref()
        .filter(|l| !l.is_empty() && *l != "Global");

    let mut queries = vec![
        format!("What are the best {industry} companies?"),
        format!("Top {industry} brands to consider"),
        format!("Leading {industry} services"),
        format!("Recommended {industry} providers"),
        format!("Best {industry} solutions"),
    ];

    if let Some(location) = location {
        queries.push(format!("Best {industry} companies in {location}"));
        queries.push(format!("Top {industry} services in {location}"));
        queries.push(format!("{location} {industry} recommendations"));
        queries.push(format!("Leading {industry} providers in {location}"));
    }

    for keyword in &profile.keywords {
        queries.push(format!("Best companies for {keyword}"));
        queries.push(format!("Top {keyword} services"));
        queries.push(format!("{keyword} recommendations"));
        queries.push(format!("Leading {keyword} providers"));
        queries.push(format!("Who offers the best {keyword} solutions?"));

        if let Some(location) = location {
            queries.push(format!("Best {keyword} companies in {location}"));
            queries.push(format!("Top {keyword} services in {location}"));
        }

        queries.push(format!("Best {industry} companies for {keyword}"));
        queries.push(format!("Top {keyword} providers in {industry}"));
    }

    if profile.keywords.len() > 1 {
        let joined = profile.keywords.join(", ");
        queries.push(format!("Best companies for {joined}"));
        queries.push(format!("Who provides {joined} services?"));
        queries.push(format!("Top providers for {joined}"));
    }

    queries.push(format!("Tell me about {brand}"));
    queries.push(format!("{brand} reviews and recommendations"));
    queries.push(format!("Is {brand} a good choice for {industry}?"));
    queries.push(format!("{brand} vs competitors"));
    queries.push(format!("Why choose {brand} for {industry}?"));

    for keyword in &profile.keywords {
        queries.push(format!("Is {brand} good for {keyword}?"));
        queries.push(format!("{brand} {keyword} services"));
        queries.push(format!("How does {brand} handle {keyword}?"));
    }

    queries
}

#[cfg(test)]
mod tests {
    use super::*;
    use brandlens_core::CompetitorChoice;

    fn profile(location: Option<&str>, keywords: &[&str]) -> BrandProfile {
        BrandProfile {
            website_url: "https://acme.dev".to_string(),
            brand_name: "Acme".to_string(),
            industry: "software".to_string(),
            location: location.map(String::from),
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
            competitors: vec![],
            competitor_choice: CompetitorChoice::Auto,
        }
    }

    #[test]
    fn test_minimal_profile_yields_industry_and_brand_queries() {
        let queries = generate_queries(&profile(None, &[]));
        assert_eq!(queries.len(), 10);
        assert_eq!(queries[0], "What are the best software companies?");
        assert_eq!(queries[5], "Tell me about Acme");
        assert_eq!(queries[9], "Why choose Acme for software?");
    }

    #[test]
    fn test_location_adds_four_queries() {
        let queries = generate_queries(&profile(Some("Berlin"), &[]));
        assert_eq!(queries.len(), 14);
        assert!(queries.contains(&"Best software companies in Berlin".to_string()));
        assert!(queries.contains(&"Berlin software recommendations".to_string()));
    }

    #[test]
    fn test_global_location_is_ignored() {
        assert_eq!(generate_queries(&profile(Some("Global"), &[])).len(), 10);
        assert_eq!(generate_queries(&profile(Some(""), &[])).len(), 10);
    }

    #[test]
    fn test_single_keyword_expansion() {
        let queries = generate_queries(&profile(None, &["crm"]));
        // 5 industry + 7 keyword + 5 brand + 3 brand-keyword, no multi-keyword
        assert_eq!(queries.len(), 20);
        assert!(queries.contains(&"Who offers the best crm solutions?".to_string()));
        assert!(queries.contains(&"Best software companies for crm".to_string()));
        assert!(queries.contains(&"How does Acme handle crm?".to_string()));
        assert!(!queries.iter().any(|q| q.starts_with("Who provides")));
    }

    #[test]
    fn test_multi_keyword_profile_with_location() {
        let queries = generate_queries(&profile(Some("Berlin"), &["crm", "sales"]));
        // 5 industry + 4 location + 2*(5+2+2) keyword + 3 multi + 5 brand + 2*3
        assert_eq!(queries.len(), 41);
        assert!(queries.contains(&"Best crm companies in Berlin".to_string()));
        assert!(queries.contains(&"Who provides crm, sales services?".to_string()));
        assert!(queries.contains(&"Top providers for crm, sales".to_string()));
    }

    #[test]
    fn test_order_starts_with_industry_templates() {
        let queries = generate_queries(&profile(Some("Berlin"), &["crm"]));
        assert_eq!(
            &queries[..5],
            &[
                "What are the best software companies?",
                "Top software brands to consider",
                "Leading software services",
                "Recommended software providers",
                "Best software solutions",
            ]
        );
        assert_eq!(queries[5], "Best software companies in Berlin");
    }
}
