use std::collections::HashMap;

use rand::seq::IndexedRandom;

/// Static category → candidate-word mapping.
///
/// The bank is immutable for the process lifetime; rooms reference
/// categories by name at creation time.
#[derive(Debug, Clone)]
pub struct WordBank {
    categories: HashMap<&'static str, &'static [&'static str]>,
}

const MALAYALAM_MOVIES: &[&str] = &[
    "Drishyam",
    "Lucifer",
    "Premam",
    "Bangalore Days",
    "Spadikam",
    "Kireedam",
    "Hridayam",
    "Kumbalangi Nights",
    "Maheshinte Prathikaram",
    "Angamaly Diaries",
    "Ustad Hotel",
    "Charlie",
    "Action Hero Biju",
    "Ee Ma Yau",
    "Virus",
    "Trance",
    "Jallikattu",
    "The Great Indian Kitchen",
    "Minnal Murali",
    "Joji",
    "Malik",
    "Nayattu",
    "Kala",
    "Home",
    "Unda",
    "Android Kunjappan",
    "Manichitrathazhu",
    "Devasuram",
    "Narasimham",
    "Oru Vadakkan Veeragatha",
    "Bheeshma Parvam",
    "Kurup",
    "Drishyam 2",
    "Ayyappanum Koshiyum",
    "Kappela",
    "Anjaam Pathiraa",
    "Driving License",
    "Uyare",
    "Sudani from Nigeria",
    "Odiyan",
    "Take Off",
    "Mayaanadhi",
    "Ohm Shanthi Oshaana",
    "Ennu Ninte Moideen",
    "Kammatipaadam",
    "Oppam",
    "Pulimurugan",
    "Ezra",
    "In Harihar Nagar",
    "Ramji Rao Speaking",
    "Sandesham",
    "Nadodikattu",
    "Vietnam Colony",
    "CID Moosa",
    "Meesa Madhavan",
    "Punjabi House",
    "Kilukkam",
    "Thenmavin Kombath",
    "Thanmathra",
    "Pathemari",
    "Mumbai Police",
    "Memories",
    "Papanasam",
    "Thattathin Marayathu",
    "Neram",
    "Koode",
    "Varathan",
    "Theevandi",
];

const OBJECTS: &[&str] = &[
    "Apple",
    "Banana",
    "Orange",
    "Mango",
    "Pineapple",
    "Watermelon",
    "Coconut",
    "Car",
    "Bus",
    "Bicycle",
    "Train",
    "Airplane",
    "Helicopter",
    "Boat",
    "Rocket",
    "Submarine",
    "House",
    "Castle",
    "Bridge",
    "Tower",
    "Pyramid",
    "Tree",
    "Flower",
    "Sunflower",
    "Cactus",
    "Sun",
    "Moon",
    "Star",
    "Cloud",
    "Rainbow",
    "Lightning",
    "Mountain",
    "River",
    "Beach",
    "Chair",
    "Table",
    "Bed",
    "Sofa",
    "Mirror",
    "Clock",
    "Lamp",
    "Fan",
    "Cup",
    "Spoon",
    "Knife",
    "Bottle",
    "Kettle",
    "Pillow",
    "Scissors",
    "Candle",
    "Phone",
    "Laptop",
    "Camera",
    "Headphones",
    "Keyboard",
    "Printer",
    "Battery",
    "Book",
    "Pencil",
    "Eraser",
    "Ruler",
    "Backpack",
    "Umbrella",
    "Glasses",
    "Crown",
    "Helmet",
    "Football",
    "Cricket Ball",
    "Chess",
    "Dice",
    "Kite",
    "Guitar",
    "Piano",
    "Drum",
    "Flute",
    "Violin",
    "Pizza",
    "Burger",
    "Sandwich",
    "Cake",
    "Ice Cream",
    "Elephant",
    "Lion",
    "Monkey",
    "Giraffe",
    "Penguin",
    "Owl",
    "Parrot",
    "Turtle",
    "Butterfly",
    "Heart",
    "Triangle",
    "Arrow",
    "Hammer",
    "Ladder",
    "Key",
    "Flag",
    "Compass",
    "Telescope",
    "Balloon",
    "Robot",
    "Magnet",
];

impl Default for WordBank {
    fn default() -> Self {
        let mut categories: HashMap<&'static str, &'static [&'static str]> = HashMap::new();
        categories.insert("Malayalam Movies", MALAYALAM_MOVIES);
        categories.insert("Objects", OBJECTS);
        Self { categories }
    }
}

impl WordBank {
    pub fn categories(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.categories.keys().copied()
    }

    pub fn contains_category(&self, category: &str) -> bool {
        self.categories.contains_key(category)
    }

    /// Pick up to `n` distinct random words from `category`. Unknown
    /// categories yield an empty list.
    pub fn pick(&self, category: &str, n: usize) -> Vec<String> {
        let Some(words) = self.categories.get(category) else {
            return Vec::new();
        };
        let mut rng = rand::rng();
        words
            .choose_multiple(&mut rng, n.min(words.len()))
            .map(|w| (*w).to_string())
            .collect()
    }

    /// Pick a single random word from `category`.
    pub fn pick_one(&self, category: &str) -> Option<String> {
        let words = self.categories.get(category)?;
        let mut rng = rand::rng();
        words.choose(&mut rng).map(|w| (*w).to_string())
    }
}
