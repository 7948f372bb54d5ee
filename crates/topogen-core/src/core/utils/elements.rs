use phf::{Map, phf_map};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Element {
    pub symbol: &'static str,
    pub atomic_number: u8,
    /// Standard atomic weight in atomic mass units.
    pub mass: f64,
}

macro_rules! element {
    ($symbol:literal, $z:literal, $mass:literal) => {
        Element {
            symbol: $symbol,
            atomic_number: $z,
            mass: $mass,
        }
    };
}

#[rustfmt::skip]
static ELEMENTS: Map<&'static str, Element> = phf_map! {
    "H"  => element!("H", 1, 1.008),    "He" => element!("He", 2, 4.0026),
    "Li" => element!("Li", 3, 6.94),    "Be" => element!("Be", 4, 9.0122),
    "B"  => element!("B", 5, 10.81),    "C"  => element!("C", 6, 12.011),
    "N"  => element!("N", 7, 14.007),   "O"  => element!("O", 8, 15.999),
    "F"  => element!("F", 9, 18.998),   "Ne" => element!("Ne", 10, 20.180),
    "Na" => element!("Na", 11, 22.990), "Mg" => element!("Mg", 12, 24.305),
    "Al" => element!("Al", 13, 26.982), "Si" => element!("Si", 14, 28.085),
    "P"  => element!("P", 15, 30.974),  "S"  => element!("S", 16, 32.06),
    "Cl" => element!("Cl", 17, 35.45),  "Ar" => element!("Ar", 18, 39.948),
    "K"  => element!("K", 19, 39.098),  "Ca" => element!("Ca", 20, 40.078),
    "Fe" => element!("Fe", 26, 55.845), "Cu" => element!("Cu", 29, 63.546),
    "Zn" => element!("Zn", 30, 65.38),  "Ge" => element!("Ge", 32, 72.630),
    "As" => element!("As", 33, 74.922), "Se" => element!("Se", 34, 78.971),
    "Br" => element!("Br", 35, 79.904), "Kr" => element!("Kr", 36, 83.798),
    "Rb" => element!("Rb", 37, 85.468), "Sr" => element!("Sr", 38, 87.62),
    "Sn" => element!("Sn", 50, 118.71), "Te" => element!("Te", 52, 127.60),
    "I"  => element!("I", 53, 126.90),  "Xe" => element!("Xe", 54, 131.29),
    "Cs" => element!("Cs", 55, 132.91), "Ba" => element!("Ba", 56, 137.33),
};

/// Looks up an element by symbol, accepting any capitalization ("cl", "CL").
pub fn element(symbol: &str) -> Option<&'static Element> {
    let symbol = symbol.trim();
    if let Some(found) = ELEMENTS.get(symbol) {
        return Some(found);
    }
    let mut chars = symbol.chars();
    let first = chars.next()?;
    let normalized: String = first
        .to_uppercase()
        .chain(chars.flat_map(char::to_lowercase))
        .collect();
    ELEMENTS.get(normalized.as_str())
}

pub fn by_atomic_number(z: u8) -> Option<&'static Element> {
    ELEMENTS.values().find(|e| e.atomic_number == z)
}
