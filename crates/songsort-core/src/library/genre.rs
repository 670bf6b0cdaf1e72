use std::fmt;

use serde::{Deserialize, Serialize};
use unicode_normalization::{UnicodeNormalization, char::is_combining_mark};

/// Categorías de género a las que se reduce el texto libre de los tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Genre {
    Country,
    Disco,
    NewAge,
    Alternative,
    Rap,
    Classical,
    Dance,
    Electronic,
    House,
    Reggae,
    Rock,
    Pop,
    Jazz,
    Latin,
    Metal,
    Singer,
    Soundtrack,
    Game,
    Gospel,
    World,
    Instrumental,
    Meditative,
    Experimental,
    JPop,
    Book,
    Fantasy,
    Kids,
    Teens,
    Sports,
    Surf,
    Tv,
    BritPop,
    Variete,
    German,
    Unknown,
}

/// Reglas en orden de precedencia: gana la primera cuyo algún fragmento aparezca.
/// "pop" va casi al final para que "brit", "j-pop", etc. ganen antes.
const RULES: &[(Genre, &[&str])] = &[
    (Genre::Country, &["country"]),
    (Genre::Variete, &["variete", "franc", "french"]),
    (Genre::BritPop, &["brit"]),
    (Genre::German, &["german"]),
    (Genre::Disco, &["disco", "funk", "wave"]),
    (Genre::NewAge, &["age", "old", "swing"]),
    (
        Genre::Rap,
        &["rap", "hip-hop", "hiphop", "hip hop", "soul", "r&b", "rnb", "r'n'b"],
    ),
    (Genre::Alternative, &["alternati", "indie", "trip"]),
    (Genre::Classical, &["classi", "symphoni", "sonat", "chamb"]),
    (Genre::Dance, &["dance", "danse"]),
    (
        Genre::Electronic,
        &["lectroni", "dubstep", "tech", "trance", "fusion", "acid", "club"],
    ),
    (Genre::House, &["house", "lounge"]),
    (Genre::Reggae, &["reggae", "dub", "root", "ska"]),
    (Genre::Jazz, &["jazz"]),
    (
        Genre::Latin,
        &["latin", "tango", "samba", "spain", "spanish", "espagn"],
    ),
    (Genre::Metal, &["metal", "punk", "hard", "bass", "jungle"]),
    (
        Genre::Singer,
        &[
            "singer", "chant", "vocal", "auteur", "writer", "voix", "voice", "spoken", "parle", "podcast",
        ],
    ),
    (Genre::Soundtrack, &["soundtrack", "movie", "film", "video"]),
    (
        Genre::Kids,
        &[
            "kid", "child", "enfan", "family", "famille", "christmas", "holiday", "vacance",
        ],
    ),
    (Genre::Gospel, &["gospel", "christ", "chreti", "religi", "spirit"]),
    (Genre::World, &["world", "monde", "folk", "europ"]),
    (Genre::Instrumental, &["instrument", "acousti", "ambient", "ambian"]),
    (Genre::Meditative, &["meditat", "down"]),
    (Genre::JPop, &["jpop", "j-pop", "j pop", "anime"]),
    (Genre::Book, &["book"]),
    (Genre::Fantasy, &["fantas", "scifi", "sci-fi", "sci fi"]),
    (Genre::Surf, &["surf"]),
    (Genre::Sports, &["sport"]),
    (Genre::Tv, &["tv", "television"]),
    (Genre::Pop, &["pop"]),
    (Genre::Rock, &["rock", "grunge", "drum", "blues", "guitar"]),
    (Genre::Experimental, &["experiment", "industrial"]),
    (Genre::Game, &["game", "jeu"]),
    (Genre::Teens, &["teen", "ado"]),
    (Genre::Unknown, &["unknown", "other", "easy"]),
];

impl Genre {
    pub const ALL: &'static [Genre] = &[
        Genre::Country,
        Genre::Disco,
        Genre::NewAge,
        Genre::Alternative,
        Genre::Rap,
        Genre::Classical,
        Genre::Dance,
        Genre::Electronic,
        Genre::House,
        Genre::Reggae,
        Genre::Rock,
        Genre::Pop,
        Genre::Jazz,
        Genre::Latin,
        Genre::Metal,
        Genre::Singer,
        Genre::Soundtrack,
        Genre::Game,
        Genre::Gospel,
        Genre::World,
        Genre::Instrumental,
        Genre::Meditative,
        Genre::Experimental,
        Genre::JPop,
        Genre::Book,
        Genre::Fantasy,
        Genre::Kids,
        Genre::Teens,
        Genre::Sports,
        Genre::Surf,
        Genre::Tv,
        Genre::BritPop,
        Genre::Variete,
        Genre::German,
        Genre::Unknown,
    ];

    /// Reduce un género en texto libre a una categoría, o `None` si ninguna regla aplica.
    pub fn classify(raw: &str) -> Option<Genre> {
        let normalized = normalize(raw);

        RULES
            .iter()
            .find(|(_, keywords)| keywords.iter().any(|k| normalized.contains(k)))
            .map(|(genre, _)| *genre)
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            Genre::Country => "🤠",
            Genre::Disco => "🕺",
            Genre::NewAge => "📻",
            Genre::Alternative => "🔌",
            Genre::Rap => "🎙",
            Genre::Classical => "🎻",
            Genre::Dance => "💃",
            Genre::Electronic => "🎛",
            Genre::House => "🏠",
            Genre::Reggae => "🇯🇲",
            Genre::Rock => "🎸",
            Genre::Pop => "🎤",
            Genre::Jazz => "🎷",
            Genre::Latin => "🇪🇸",
            Genre::Metal => "🤘",
            Genre::Singer => "👨‍🎤",
            Genre::Soundtrack => "🎥",
            Genre::Game => "🎮",
            Genre::Gospel => "⛪️",
            Genre::World => "🌍",
            Genre::Instrumental => "🎹",
            Genre::Meditative => "💤",
            Genre::Experimental => "⚗️",
            Genre::JPop => "🇯🇵",
            Genre::Book => "📓",
            Genre::Fantasy => "👽",
            Genre::Kids => "👶",
            Genre::Teens => "⭐️",
            Genre::Sports => "⚽️",
            Genre::Surf => "🏄",
            Genre::Tv => "📺",
            Genre::BritPop => "🇬🇧",
            Genre::Variete => "🇫🇷",
            Genre::German => "🇩🇪",
            Genre::Unknown => "❓",
        }
    }

    /// Todas las categorías ordenadas alfabéticamente por su nombre.
    pub fn catalog() -> Vec<Genre> {
        let mut all = Genre::ALL.to_vec();
        all.sort_by_cached_key(|g| normalize(&g.to_string()));
        all
    }
}

impl fmt::Display for Genre {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Genre::Country => "Country",
            Genre::Disco => "Disco, Funk, Wave",
            Genre::NewAge => "New Age",
            Genre::Alternative => "Alternative, Indie",
            Genre::Rap => "Rap, Hip-Hop, R'n'B, Soul",
            Genre::Classical => "Classical",
            Genre::Dance => "Dance",
            Genre::Electronic => "Electronic, Club, Dubstep",
            Genre::House => "House",
            Genre::Reggae => "Reggae",
            Genre::Rock => "Rock",
            Genre::Pop => "Pop",
            Genre::Jazz => "Jazz",
            Genre::Latin => "Latin",
            Genre::Metal => "Metal, Punk",
            Genre::Singer => "Singer, Voice",
            Genre::Soundtrack => "Soundtrack",
            Genre::Game => "Game",
            Genre::Gospel => "Gospel, Spiritual",
            Genre::World => "World",
            Genre::Instrumental => "Instrumental",
            Genre::Meditative => "Meditative",
            Genre::Experimental => "Experimental",
            Genre::JPop => "J-Pop",
            Genre::Book => "Book",
            Genre::Fantasy => "Fantasy",
            Genre::Kids => "Kids",
            Genre::Teens => "Teens",
            Genre::Sports => "Sports",
            Genre::Surf => "Surf",
            Genre::Tv => "TV",
            Genre::BritPop => "Brit-Pop",
            Genre::Variete => "Variété",
            Genre::German => "German",
            Genre::Unknown => "Unknown",
        };
        write!(f, "{}", text)
    }
}

/// Género de una canción: la categoría deducida y el texto original del tag.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SongGenre {
    pub category: Option<Genre>,
    pub raw: Option<String>,
}

impl SongGenre {
    pub fn from_raw(raw: Option<String>) -> Self {
        let category = raw.as_deref().and_then(Genre::classify);
        SongGenre { category, raw }
    }
}

/// Minúsculas y sin diacríticos, para comparar texto de tags.
pub fn normalize(input: &str) -> String {
    input
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect::<String>()
        .to_lowercase()
}
