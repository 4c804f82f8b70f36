use is_it_safe::analyzer::{NO_INGREDIENTS_PLACEHOLDER, UNKNOWN_PRODUCT_PLACEHOLDER};
use is_it_safe::{
    analyze, extract_ingredients, is_safe_quick, matches, normalize, BlacklistItem, ProductRecord,
};

fn blacklist(names: &[&str]) -> Vec<BlacklistItem> {
    names.iter().map(|name| BlacklistItem::new(*name)).collect()
}

fn sample_products() -> Vec<ProductRecord> {
    vec![
        ProductRecord::new("Chocolate Bar", "Sugar, cocoa butter, whole MILK powder, (soy lecithin)"),
        ProductRecord::new("Peanut Snack", "Peanuts [roasted], salt; palm oil"),
        ProductRecord::new("Water", ""),
        ProductRecord::new("Bread", "").with_english_ingredients("Wheat flour, water, yeast"),
        ProductRecord::default(),
    ]
}

mod normalization {
    use super::*;

    #[test]
    fn test_normalize_is_idempotent() {
        let inputs = [
            "",
            "  Sugar,  MILK (2%) ",
            "{a}[b](c):d;e'f\"g",
            "multi\n\tline\r\ntext",
            "ÉCLAIR, Crème",
        ];
        for input in inputs {
            let once = normalize(input);
            assert_eq!(normalize(&once), once, "not idempotent for {:?}", input);
        }
    }

    #[test]
    fn test_normalize_replaces_every_separator() {
        assert_eq!(normalize("a(b)c,d[e]f{g}h:i;j'k\"l"), "a b c d e f g h i j k l");
    }

    #[test]
    fn test_normalize_keeps_other_punctuation() {
        assert_eq!(normalize("E-330. Salt!"), "e-330. salt!");
    }
}

mod matching {
    use super::*;

    #[test]
    fn test_case_insensitive() {
        assert!(matches("milk", "Whole MILK Powder"));
        assert!(matches("MILK", "whole milk powder"));
        assert!(matches("MiLk", "wHoLe MiLK"));
    }

    #[test]
    fn test_substring_policy() {
        assert!(matches("milk", "buttermilk"));
        assert!(matches("Milk", "Buttermilk, sugar"));
        assert!(matches("nut", "Peanuts"));
        assert!(!matches("almond", "peanuts, hazelnuts"));
    }

    #[test]
    fn test_punctuation_insensitive() {
        assert!(matches("soy lecithin", "(soy) lecithin"));
        assert!(matches("palm oil", "palm;oil"));
        assert!(matches("milk, powder", "milk powder"));
    }

    #[test]
    fn test_empty_term_matches_everything() {
        assert!(matches("", "anything"));
        assert!(matches("   ", "anything"));
        assert!(matches("()", ""));
    }
}

mod analysis {
    use super::*;

    #[test]
    fn test_safety_follows_matches() {
        let lists = [
            blacklist(&[]),
            blacklist(&["milk"]),
            blacklist(&["gluten", "almond"]),
            blacklist(&["salt", "Peanut", "salt"]),
        ];
        for product in sample_products() {
            for list in &lists {
                let result = analyze(&product, list);
                assert_eq!(result.is_safe(), result.matched_ingredients().is_empty());
            }
        }
    }

    #[test]
    fn test_quick_check_agrees_with_full_analysis() {
        let lists = [
            blacklist(&[]),
            blacklist(&["milk"]),
            blacklist(&["wheat"]),
            blacklist(&["gluten", "almond"]),
            blacklist(&[""]),
        ];
        for product in sample_products() {
            let text = extract_ingredients(&product);
            for list in &lists {
                assert_eq!(
                    is_safe_quick(&text, list),
                    analyze(&product, list).is_safe(),
                    "disagreement for {:?} with {:?}",
                    product.name,
                    list.iter().map(|i| &i.name).collect::<Vec<_>>()
                );
            }
        }
    }

    #[test]
    fn test_empty_blacklist_is_always_safe() {
        for product in sample_products() {
            let result = analyze(&product, &[]);
            assert!(result.is_safe());
            assert!(result.matched_ingredients().is_empty());
        }
    }

    #[test]
    fn test_matches_keep_blacklist_order() {
        let product = ProductRecord::new("Mix", "salt, sugar, milk");
        let result = analyze(&product, &blacklist(&["Milk", "gluten", "Salt", "sugar"]));
        assert_eq!(result.matched_ingredients(), ["Milk", "Salt", "sugar"]);
    }

    #[test]
    fn test_matches_follow_blacklist_not_ingredient_order() {
        let product = ProductRecord::new("Candy", "Soy Lecithin, Red 40, Skimmed Milk");
        let result = analyze(&product, &blacklist(&["Milk", "Soy", "Red 40"]));
        assert_eq!(result.matched_ingredients(), ["Milk", "Soy", "Red 40"]);
        assert!(!result.is_safe());
    }

    #[test]
    fn test_duplicate_terms_are_reported_twice() {
        let product = ProductRecord::new("Cheese", "milk, salt, rennet");
        let result = analyze(&product, &blacklist(&["milk", "milk"]));
        assert_eq!(result.matched_ingredients(), ["milk", "milk"]);
        assert!(!result.is_safe());
    }

    #[test]
    fn test_matched_names_are_display_names() {
        let product = ProductRecord::new("Cake", "flour, EGGS, sugar");
        let result = analyze(&product, &blacklist(&["Eggs (free range)"]));
        assert!(result.is_safe());

        let result = analyze(&product, &blacklist(&["  Eggs  "]));
        assert_eq!(result.matched_ingredients(), ["  Eggs  "]);
    }

    #[test]
    fn test_empty_term_makes_any_product_unsafe() {
        let result = analyze(&ProductRecord::default(), &blacklist(&[""]));
        assert!(!result.is_safe());
        assert_eq!(result.matched_ingredients(), [""]);
    }

    #[test]
    fn test_fallback_values() {
        let result = analyze(&ProductRecord::default(), &blacklist(&["milk"]));
        assert_eq!(result.product_name(), UNKNOWN_PRODUCT_PLACEHOLDER);
        assert_eq!(result.full_ingredients_list(), NO_INGREDIENTS_PLACEHOLDER);
        assert_eq!(result.barcode(), "");
        assert!(result.is_safe());

        let unnamed = ProductRecord {
            name: Some(String::new()),
            ..ProductRecord::new("", "   ")
        };
        let result = analyze(&unnamed, &[]);
        assert_eq!(result.product_name(), "Unknown Product");
        assert_eq!(result.full_ingredients_list(), "No ingredients listed");
    }

    #[test]
    fn test_result_carries_product_details() {
        let product = ProductRecord::new("Nutella", "  Sugar, palm oil, HAZELNUTS 13%  ")
            .with_barcode("3017620422003");
        let result = analyze(&product, &blacklist(&["palm oil", "hazelnut"]));
        assert_eq!(result.product_name(), "Nutella");
        assert_eq!(result.barcode(), "3017620422003");
        assert_eq!(result.full_ingredients_list(), "Sugar, palm oil, HAZELNUTS 13%");
        assert_eq!(result.matched_ingredients(), ["palm oil", "hazelnut"]);
    }

    #[test]
    fn test_english_ingredients_used_when_primary_missing() {
        let product = ProductRecord {
            ingredients_text: None,
            ..ProductRecord::default().with_english_ingredients("Wheat flour, water")
        };
        let result = analyze(&product, &blacklist(&["wheat"]));
        assert!(!result.is_safe());
        assert_eq!(result.full_ingredients_list(), "Wheat flour, water");
    }

    #[test]
    fn test_whitespace_primary_field_wins_over_english() {
        let product = ProductRecord::new("Odd", "   ").with_english_ingredients("milk");
        assert_eq!(extract_ingredients(&product), "");
        assert!(analyze(&product, &blacklist(&["milk"])).is_safe());
    }

    #[test]
    fn test_serialized_result_keeps_invariant() {
        let product = ProductRecord::new("Yogurt", "milk, cultures").with_barcode("12345678");
        let result = analyze(&product, &blacklist(&["milk"]));
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["is_safe"], false);
        assert_eq!(json["matched_ingredients"][0], "milk");
        assert_eq!(json["barcode"], "12345678");
    }
}

#[test]
fn test_concurrent_analysis_is_consistent() {
    let product = ProductRecord::new("Granola", "oats, honey, almonds, milk powder");
    let list = blacklist(&["almond", "soy", "milk"]);
    let expected = analyze(&product, &list);
    let (product, list) = (&product, &list);

    std::thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|_| {
                scope.spawn(move || (0..200).map(|_| analyze(product, list)).collect::<Vec<_>>())
            })
            .collect();
        for handle in handles {
            for result in handle.join().unwrap() {
                assert_eq!(result, expected);
            }
        }
    });
}
