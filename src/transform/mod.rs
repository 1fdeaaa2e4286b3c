use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

pub const RANDOM_VALUE_LEN: usize = 7;
pub const DEFAULT_PLACEHOLDER_PREFIX: &str = "msarjun";

const LOWERCASE: &[u8] = b"abcdefghijklmnopqrstuvwxyz";

/// Supplies the value written next to each discovered parameter.
pub trait ValueGenerator {
    /// `position` is the 1-based index of `name` in the discovered list.
    fn value_for(&mut self, position: usize, name: &str) -> String;
}

// lowercase letters drawn independently for every parameter
#[derive(Debug)]
pub struct RandomValues<R: Rng> {
    rng: R,
    len: usize,
}

impl RandomValues<StdRng> {
    pub fn from_entropy() -> Self {
        Self::with_rng(StdRng::from_entropy(), RANDOM_VALUE_LEN)
    }
}

impl<R: Rng> RandomValues<R> {
    pub fn with_rng(rng: R, len: usize) -> Self {
        Self { rng, len }
    }
}

impl<R: Rng> ValueGenerator for RandomValues<R> {
    fn value_for(&mut self, _position: usize, _name: &str) -> String {
        (0..self.len)
            .map(|_| LOWERCASE[self.rng.gen_range(0..LOWERCASE.len())] as char)
            .collect()
    }
}

// "<prefix><position>", reproducible across runs
#[derive(Clone, Debug)]
pub struct SequentialValues {
    prefix: String,
}

impl SequentialValues {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }
}

impl Default for SequentialValues {
    fn default() -> Self {
        Self::new(DEFAULT_PLACEHOLDER_PREFIX)
    }
}

impl ValueGenerator for SequentialValues {
    fn value_for(&mut self, position: usize, _name: &str) -> String {
        format!("{}{}", self.prefix, position)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ValueMode {
    #[default]
    Random,
    Sequential,
}

impl ValueMode {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "random" | "rand" => Some(Self::Random),
            "sequential" | "seq" => Some(Self::Sequential),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ValueMode::Random => "random",
            ValueMode::Sequential => "sequential",
        }
    }

    /// A generator for one transform call; random mode reseeds every time.
    pub fn generator(self) -> Box<dyn ValueGenerator + Send> {
        match self {
            ValueMode::Random => Box::new(RandomValues::from_entropy()),
            ValueMode::Sequential => Box::new(SequentialValues::default()),
        }
    }
}

pub fn build_query(names: &[String], values: &mut dyn ValueGenerator) -> String {
    names
        .iter()
        .enumerate()
        .map(|(i, name)| format!("{}={}", name, values.value_for(i + 1, name)))
        .collect::<Vec<_>>()
        .join("&")
}

/// Appends the synthesized query to `url`.
///
/// Existing queries are extended with `&`, so the result never carries a
/// second `?`. Older msarjun output always used `?` here.
pub fn transform_url(url: &str, names: &[String], values: &mut dyn ValueGenerator) -> String {
    let query = build_query(names, values);
    let separator = if url.contains('?') {
        if url.ends_with('?') || url.ends_with('&') {
            ""
        } else {
            "&"
        }
    } else {
        "?"
    };
    format!("{url}{separator}{query}")
}
