//! Hand-curated seed organizations.
//!
//! Always available and instant; the floor under every discovery run
//! even when no external API is configured.

use crate::types::{Category, OrganizationCandidate};

/// The curated seed list with pre-assigned categories and scores.
pub fn seed_organizations() -> Vec<OrganizationCandidate> {
    use Category::*;
    let seed = OrganizationCandidate::seed;
    vec![
        seed("PetSmart Charities", "https://www.petsmartcharities.org", PetIndustry, 10, "Dedicated animal welfare grant-making arm of PetSmart."),
        seed("Petco Love", "https://petcolove.org", PetIndustry, 10, "Petco's charitable foundation. Grants to animal welfare orgs."),
        seed("Hill's Pet Nutrition Foundation", "https://hillspet.com", PetIndustry, 9, "Science Diet maker. Active Food, Shelter, Love grant program."),
        seed("Purina Pro Plan Shelter Champions", "https://proplanshelterstars.com", PetIndustry, 9, "Purina shelter support program - food and supplies."),
        seed("Royal Canin USA", "https://www.royalcanin.com/us", PetIndustry, 8, "Partners with shelters and rescues for product donations."),
        seed("Banfield Foundation", "https://banfieldfoundation.org", PetIndustry, 9, "Funds preventive veterinary care at shelters."),
        seed("Zoetis Petcare", "https://www.zoetispetcare.com", PetIndustry, 8, "Animal health company with shelter support programs."),
        seed("Tractor Supply Company Foundation", "https://www.tractorsupply.com", PetIndustry, 7, "Annual Rescue Express program supports shelters."),
        seed("KONG Company", "https://www.kongcompany.com", PetIndustry, 7, "Donates products to shelters and rescue groups."),
        seed("Kuranda Dog Beds", "https://www.kuranda.com", PetIndustry, 6, "Shelter dog bed donation program."),
        seed("Beyond Meat", "https://www.beyondmeat.com", VeganBrand, 7, "Vegan brand with documented animal welfare giving."),
        seed("Impossible Foods", "https://www.impossiblefoods.com", VeganBrand, 7, "Mission-aligned brand; has supported animal welfare causes."),
        seed("Oatly", "https://www.oatly.com", VeganBrand, 6, "Values-driven brand; open to animal welfare co-promotion."),
        seed("Amazon (AmazonSmile / AWS Imagine Grant)", "https://www.amazon.com/gp/charity", CorporateCsr, 8, "AmazonSmile donates 0.5% of purchases to nonprofits."),
        seed("Google.org", "https://www.google.org", CorporateCsr, 7, "Google's philanthropic arm. Grants to nonprofits."),
        seed("Salesforce.org", "https://www.salesforce.org", CorporateCsr, 7, "1-1-1 model. Grants + free tech to nonprofits."),
        seed("Microsoft Philanthropies", "https://www.microsoft.com/en-us/philanthropies", CorporateCsr, 7, "Grants + in-kind tech to qualifying nonprofits."),
        seed("Maddie's Fund", "https://www.maddiesfund.org", Foundation, 10, "Leading funder of animal shelter and rescue innovation."),
        seed("Petfinder Foundation", "https://www.petfinderfoundation.com", Foundation, 9, "Direct grants to shelters and rescues."),
        seed("American Humane", "https://www.americanhumane.org", Nonprofit, 8, "Grant programs and partnerships for shelters."),
        seed("Doris Day Animal Foundation", "https://www.dorisdayanimalfoundation.org", Foundation, 8, "Grants to companion animal shelters and spay/neuter programs."),
        seed("Grey Muzzle Organization", "https://www.greymuzzle.org", Foundation, 7, "Grants specifically for senior dog programs at shelters."),
        seed("PetSafe Foundation", "https://www.petsafe.net", PetIndustry, 7, "Product donations and grants to animal welfare orgs."),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SourceTag;

    #[test]
    fn test_seed_list_shape() {
        let orgs = seed_organizations();
        assert_eq!(orgs.len(), 23);
        for org in &orgs {
            assert_eq!(org.source, SourceTag::Seed);
            assert!(!org.name.is_empty());
            assert!(org.website.is_some());
            assert!((1..=10).contains(&org.donation_potential_score));
        }
    }

    #[test]
    fn test_seed_list_has_no_duplicates() {
        let orgs = seed_organizations();
        let deduped = crate::types::dedupe_candidates(orgs.clone());
        assert_eq!(deduped.len(), orgs.len());
    }
}
