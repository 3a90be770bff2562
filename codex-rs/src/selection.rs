/// Resolve a region selection expression against a sorted region list.
///
/// The expression is `all` or a comma list whose items are region names,
/// indices (negative counts from the end) or `start:stop:step` slices with
/// Python slice semantics. The result keeps list order, without repeats.
pub fn select_regions(expr: &str, regions: &[String]) -> crate::Result<Vec<String>> {
    let expr = expr.trim();
    if expr.eq_ignore_ascii_case("all") {
        return Ok(regions.to_vec());
    }

    let len = regions.len() as isize;
    let mut picked = vec![false; regions.len()];
    for item in expr.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        if let Some(i) = regions.iter().position(|r| r == item) {
            picked[i] = true;
        } else if item.contains(':') {
            let (start, stop, step) = parse_slice(item, len)?;
            let mut i = start;
            while (step > 0 && i < stop) || (step < 0 && i > stop) {
                if (0..len).contains(&i) {
                    picked[i as usize] = true;
                }
                i += step;
            }
        } else {
            let idx: isize = item
                .parse()
                .map_err(|_| invalid(format!("unknown region or index {:?}", item)))?;
            let resolved = if idx < 0 { idx + len } else { idx };
            if !(0..len).contains(&resolved) {
                return Err(invalid(format!("index {} out of range for {} regions", idx, len)));
            }
            picked[resolved as usize] = true;
        }
    }

    Ok(regions
        .iter()
        .zip(picked)
        .filter_map(|(r, keep)| keep.then(|| r.clone()))
        .collect())
}

fn invalid(msg: String) -> crate::CodexError {
    crate::CodexError::InvalidSelection(msg)
}

/// Clamped `(start, stop, step)` for a `a:b:c` item over `len` elements.
fn parse_slice(item: &str, len: isize) -> crate::Result<(isize, isize, isize)> {
    let parts = item
        .split(':')
        .map(|p| match p.trim() {
            "" => Ok(None),
            t => t.parse::<isize>().map(Some),
        })
        .collect::<Result<Vec<_>, _>>()
        .map_err(|_| invalid(format!("bad slice {:?}", item)))?;
    if parts.len() > 3 {
        return Err(invalid(format!("bad slice {:?}", item)));
    }
    let step = parts.get(2).copied().flatten().unwrap_or(1);
    if step == 0 {
        return Err(invalid(format!("slice step cannot be zero in {:?}", item)));
    }

    let (lower, upper) = if step > 0 { (0, len) } else { (-1, len - 1) };
    let clamp = |v: isize| {
        if v < 0 {
            (v + len).max(lower)
        } else {
            v.min(upper)
        }
    };
    let start = parts[0].map(clamp).unwrap_or(if step > 0 { lower } else { upper });
    let stop = parts
        .get(1)
        .copied()
        .flatten()
        .map(clamp)
        .unwrap_or(if step > 0 { upper } else { lower });
    Ok((start, stop, step))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn regions() -> Vec<String> {
        ["reg001", "reg002", "reg003", "reg004", "reg005"]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    fn sel(expr: &str) -> Vec<String> {
        select_regions(expr, &regions()).unwrap()
    }

    #[test]
    fn all_and_names() {
        assert_eq!(sel("all").len(), 5);
        assert_eq!(sel("reg004, reg002"), vec!["reg002", "reg004"]);
    }

    #[test]
    fn indices_and_slices() {
        assert_eq!(sel("0,-1"), vec!["reg001", "reg005"]);
        assert_eq!(sel("1:3"), vec!["reg002", "reg003"]);
        assert_eq!(sel("::2"), vec!["reg001", "reg003", "reg005"]);
        assert_eq!(sel("::-2"), vec!["reg001", "reg003", "reg005"]);
        assert_eq!(sel("3:"), vec!["reg004", "reg005"]);
        assert_eq!(sel("-2:"), vec!["reg004", "reg005"]);
        assert_eq!(sel("2:100"), vec!["reg003", "reg004", "reg005"]);
    }

    #[test]
    fn rejects_bad_items() {
        for expr in ["7", "-6", "reg9", "1:2:0", "1:2:3:4", "a:b"] {
            assert!(matches!(
                select_regions(expr, &regions()),
                Err(crate::CodexError::InvalidSelection(_))
            ));
        }
    }
}
