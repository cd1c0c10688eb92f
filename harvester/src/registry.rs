use std::collections::HashSet;

/// 去重登记表
///
/// 只增不减，单次采集内有效。只在采集工作者上使用，不加锁。
#[derive(Debug, Default, Clone)]
pub struct DedupRegistry {
    seen: HashSet<String>,
}

impl DedupRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.seen.contains(key)
    }

    /// 登记一个键，返回它之前是否不存在
    pub fn add(&mut self, key: impl Into<String>) -> bool {
        self.seen.insert(key.into())
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_is_monotonic() {
        let mut registry = DedupRegistry::new();
        assert!(registry.is_empty());
        assert!(registry.add("1"));
        assert!(!registry.add("1"));
        assert!(registry.add(String::from("https://www.pinterest.com/pin/2/")));
        assert!(registry.contains("1"));
        assert!(!registry.contains("3"));
        assert_eq!(registry.len(), 2);
    }
}
