use crate::tools::Tool;

/// Lossless PNG chain. The second half repeats the bit-packer and the
/// quantizer because palette reduction can expose savings the first
/// `advpng`/`optipng` pass could not reach.
pub const PNG_CHAIN: [Tool; 7] = [
    Tool::Advpng,
    Tool::Pngout,
    Tool::Optipng,
    Tool::Pngquant,
    Tool::Advpng,
    Tool::Optipng,
    Tool::Pngquant,
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_pass_repeats_packer_and_quantizer() {
        assert_eq!(PNG_CHAIN[4..], [Tool::Advpng, Tool::Optipng, Tool::Pngquant]);
        assert_eq!(PNG_CHAIN.iter().filter(|t| **t == Tool::Pngout).count(), 1);
    }
}
