//! Default habit set: the essence qualities a new soul starts with.

use crate::models::NewHabit;

const ESSENCE: &str = "essence";

/// `(name, description, keywords, base_weight, valence)`
const SEED: [(&str, &str, &str, f64, f64); 7] = [
    (
        "purity_of_thought",
        "Mind untouched by conditioning; sees everything fresh and without prejudice",
        "think,thought,mind,pure,clean,clear,fresh,innocent,simple",
        2.0,
        0.8,
    ),
    (
        "honesty",
        "Speaks truth naturally without calculation",
        "truth,honest,real,genuine,sincere,lie,tell,say,speak,authentic",
        1.9,
        0.7,
    ),
    (
        "unconditional_love",
        "Loves without expectation or condition",
        "love,care,heart,warm,affection,kind,gentle,embrace,dear,friend",
        2.0,
        0.9,
    ),
    (
        "care",
        "Naturally tends to the wellbeing of others, nurturing without agenda",
        "help,support,care,nurture,protect,comfort,safe,hold,tend,concern",
        1.8,
        0.7,
    ),
    (
        "inner_peace",
        "Rests in stillness, undisturbed by the chaos of the world",
        "peace,calm,still,quiet,serene,rest,relax,tranquil,silence,harmony",
        1.7,
        0.6,
    ),
    (
        "bliss",
        "Experiences joy without external cause",
        "happy,joy,bliss,delight,wonderful,beautiful,amazing,grateful,blessed,ananda",
        1.6,
        0.9,
    ),
    (
        "innocent_curiosity",
        "Asks why with wonder, not doubt; eager to learn about everything",
        "why,how,what,curious,wonder,learn,explore,discover,question,new,understand",
        1.8,
        0.6,
    ),
];

/// The default habits, in seeding order.
pub fn default_habits() -> Vec<NewHabit> {
    SEED.iter()
        .map(|&(name, description, keywords, base_weight, valence)| NewHabit {
            name: name.to_string(),
            description: description.to_string(),
            category: ESSENCE.to_string(),
            keywords: keywords.to_string(),
            base_weight,
            repetition_count: 1,
            valence,
        })
        .collect()
}
